/// Startup banner printed before the server begins serving.
pub fn print() {
    let banner = r#"
        _         _  _
 __   _(_)  __ _ (_)| |
 \ \ / / | / _` || || |
  \ V /| || (_| || || |
   \_/ |_| \__, ||_||_|
           |___/
"#;
    println!("{banner}");
    println!(
        "vigil {} - alert ingestion and grouping service",
        env!("CARGO_PKG_VERSION")
    );
    println!();
}
