use apiary::{
    cli::{build_cli, error, handlers, setup},
    output,
};

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    let json = matches.get_flag("json");

    let serving = matches.subcommand_name() == Some("serve");
    if let Err(e) = setup::init_tracing(serving) {
        eprintln!("Warning: {e}");
    }

    if let Err(err) = handlers::dispatch(&matches).await {
        output::print_error(json, &err);
        std::process::exit(error::get_exit_code(&err));
    }
}
