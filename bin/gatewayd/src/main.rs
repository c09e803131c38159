use gatewayd::run;

fn main() {
    let result = run();

    if let Err(error) = result {
        eprintln!("gatewayd process failed: {error:?}");
        std::process::exit(1);
    }
}
