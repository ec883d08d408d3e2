fn main() {
    let hb = handlebars::Handlebars::new();
    let out = hb.render_template("{{desc}}", &serde_json::json!({"desc": "didn't send"})).unwrap();
    println!("{}", out);
}
