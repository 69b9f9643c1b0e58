use std::path::PathBuf;

use anyhow::Result;
use clap::ArgMatches;

use crate::{
    commands::{
        batch::{self, CreateOptions},
        serve::{self, ServeOptions},
        walk::{self, InspectOptions, PayloadSource},
    },
    context::{AppContext, GlobalOptions, Storage},
};

pub async fn dispatch(matches: &ArgMatches) -> Result<()> {
    let global = GlobalOptions::from_matches(matches);

    match matches.subcommand() {
        Some(("serve", sub_m)) => handle_serve(&global, sub_m).await,
        Some((name, sub_m)) => {
            let ctx = AppContext::load(&global, Storage::Sqlite).await?;
            handle_command(&ctx, global.json, name, sub_m).await
        }
        None => anyhow::bail!("Unknown command. Run 'apiary --help' for usage."),
    }
}

async fn handle_command(
    ctx: &AppContext,
    json: bool,
    name: &str,
    matches: &ArgMatches,
) -> Result<()> {
    match name {
        "create" => {
            let options = CreateOptions {
                hives: strings(matches, "hives"),
                json,
            };
            batch::create(ctx, &options).await
        }
        "list" => batch::list(ctx, json).await,
        "show" => batch::show(ctx, required(matches, "batch")?, json).await,
        "start" => walk::start(ctx, required(matches, "batch")?, json).await,
        "current" => walk::current(ctx, required(matches, "batch")?, json).await,
        "skip" => walk::skip(ctx, required(matches, "batch")?, json).await,
        "cancel" => {
            walk::cancel(
                ctx,
                required(matches, "batch")?,
                required(matches, "hive")?,
                json,
            )
            .await
        }
        "reorder" => {
            let hives = strings(matches, "hives");
            walk::reorder(ctx, required(matches, "batch")?, &hives, json).await
        }
        "inspect" => {
            let payload = match (
                matches.get_one::<String>("payload"),
                matches.get_one::<String>("payload-file"),
            ) {
                (Some(inline), _) => PayloadSource::Inline(inline.clone()),
                (None, Some(path)) => PayloadSource::File(PathBuf::from(path)),
                (None, None) => PayloadSource::Empty,
            };
            let options = InspectOptions {
                batch: required(matches, "batch")?.to_string(),
                date: matches.get_one::<String>("date").cloned(),
                payload,
                json,
            };
            walk::inspect(ctx, &options).await
        }
        other => anyhow::bail!("Unknown command '{other}'. Run 'apiary --help' for usage."),
    }
}

async fn handle_serve(global: &GlobalOptions, matches: &ArgMatches) -> Result<()> {
    let options = ServeOptions {
        bind: matches.get_one::<String>("bind").cloned(),
        memory: matches.get_flag("memory"),
    };
    let storage = if options.memory {
        Storage::Memory
    } else {
        Storage::Sqlite
    };
    let ctx = AppContext::load(global, storage).await?;
    serve::run(ctx, &options).await
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Missing required argument <{id}>"))
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}
