use std::io::IsTerminal;
use std::path::Path;
use std::time::SystemTime;

use color_eyre::{
    config::{HookBuilder, Theme},
    eyre::{self, Context},
};

pub fn init_eyre() -> eyre::Result<()> {
    let theme = if std::io::stderr().is_terminal() {
        Theme::dark()
    } else {
        Theme::new()
    };

    let (term_hook, eyre_hook) = HookBuilder::default().theme(theme).into_hooks();
    eyre_hook
        .install()
        .wrap_err("could not install the eyre hook")?;

    // a second, colorless report of the same panic goes to the log
    let (plain_hook, _) = HookBuilder::default().theme(Theme::new()).into_hooks();

    std::panic::set_hook(Box::new(move |info| {
        eprintln!("{}", term_hook.panic_report(info));
        log::error!(target: "panic", "{}", plain_hook.panic_report(info));
    }));

    Ok(())
}

pub fn init_logger(logfile: Option<&Path>) -> eyre::Result<()> {
    // stdout stays reserved for tool output, diagnostics go to stderr
    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    if let Some(logfile) = logfile {
        dispatch = dispatch.chain(fern::log_file(logfile).wrap_err_with(|| {
            format!("failed to open the log file at: {logfile:?}")
        })?);
    }

    dispatch.apply().wrap_err("could not register the logger")?;

    Ok(())
}
