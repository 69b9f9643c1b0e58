//! Command-line surface.

pub mod error;
pub mod handlers;
pub mod setup;

use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("apiary")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Walk a set of hives through one inspection session")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print machine-readable JSON"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("PATH")
                .help("Extra config file layered over the defaults"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .value_name("PATH")
                .help("SQLite state database (overrides state_db)"),
        )
        .subcommand(cmd_create())
        .subcommand(cmd_list())
        .subcommand(cmd_show())
        .subcommand(cmd_start())
        .subcommand(cmd_current())
        .subcommand(cmd_skip())
        .subcommand(cmd_cancel())
        .subcommand(cmd_reorder())
        .subcommand(cmd_inspect())
        .subcommand(cmd_serve())
}

fn batch_arg() -> Arg {
    Arg::new("batch")
        .required(true)
        .value_name("BATCH_ID")
        .help("Batch identifier")
}

fn cmd_create() -> Command {
    Command::new("create")
        .about("Create a draft batch over hives, in walking order")
        .arg(
            Arg::new("hives")
                .required(true)
                .num_args(1..)
                .value_name("HIVE_ID"),
        )
}

fn cmd_list() -> Command {
    Command::new("list").about("List batches, oldest first")
}

fn cmd_show() -> Command {
    Command::new("show")
        .about("Show a batch with its slots")
        .arg(batch_arg())
}

fn cmd_start() -> Command {
    Command::new("start")
        .about("Start a draft batch")
        .arg(batch_arg())
}

fn cmd_current() -> Command {
    Command::new("current")
        .about("Show the hive to inspect next")
        .arg(batch_arg())
}

fn cmd_skip() -> Command {
    Command::new("skip")
        .about("Move the current hive to the back of the walk")
        .arg(batch_arg())
}

fn cmd_cancel() -> Command {
    Command::new("cancel")
        .about("Drop a hive from the batch")
        .arg(batch_arg())
        .arg(Arg::new("hive").required(true).value_name("HIVE_ID"))
}

fn cmd_reorder() -> Command {
    Command::new("reorder")
        .about("Replace the order of the remaining hives")
        .arg(batch_arg())
        .arg(
            Arg::new("hives")
                .required(true)
                .num_args(1..)
                .value_name("HIVE_ID"),
        )
}

fn cmd_inspect() -> Command {
    Command::new("inspect")
        .about("Record an inspection for the current hive and advance")
        .arg(batch_arg())
        .arg(
            Arg::new("date")
                .long("date")
                .value_name("YYYY-MM-DD")
                .help("Inspection date (defaults to today)"),
        )
        .arg(
            Arg::new("payload")
                .long("payload")
                .value_name("JSON")
                .conflicts_with("payload-file")
                .help("Inspection details as a JSON document"),
        )
        .arg(
            Arg::new("payload-file")
                .long("payload-file")
                .value_name("PATH")
                .help("Read inspection details from a JSON file"),
        )
}

fn cmd_serve() -> Command {
    Command::new("serve")
        .about("Serve the batch API over HTTP")
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_name("ADDR")
                .help("Listen address (overrides server.bind)"),
        )
        .arg(
            Arg::new("memory")
                .long("memory")
                .action(ArgAction::SetTrue)
                .help("Keep state in memory instead of SQLite"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["apiary", "list", "--json", "--db", "/tmp/a.db"])
            .expect("parse");
        assert!(matches.get_flag("json"));
        assert_eq!(
            matches.get_one::<String>("db").map(String::as_str),
            Some("/tmp/a.db")
        );
    }

    #[test]
    fn payload_sources_conflict() {
        let result = build_cli().try_get_matches_from([
            "apiary",
            "inspect",
            "b",
            "--payload",
            "{}",
            "--payload-file",
            "p.json",
        ]);
        assert!(result.is_err());
    }
}
