// The WASM bundle has no process environment, so the analyzer settings are
// baked in at compile time. Values come from the shell or a `.env` file.
const FORWARDED: [&str; 2] = ["GEMINI_API_KEY", "GEMINI_MODEL"];

fn main() {
    if let Ok(path) = dotenv::dotenv() {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    for key in FORWARDED {
        println!("cargo:rerun-if-env-changed={}", key);
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={}={}", key, value);
        }
    }
}
