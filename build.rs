const COMMANDS: &[&str] = &["dispatch"];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
