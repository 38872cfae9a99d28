use std::convert::Infallible;
use std::ffi::OsString;

use anyhow::Context;
use sgx_runc::catalog::ResourceCatalog;
use sgx_runc::cli::Invocation;
use sgx_runc::config::Config;
use sgx_runc::device::HostDevices;
use sgx_runc::{hook, launcher, logger};

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let prog = args
        .first()
        .map(|a| a.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sgx-runc".to_string());

    let config = Config::build_from_env();
    if let Err(err) = logger::init(&config) {
        eprintln!("{prog}: open {}, {err:#}", config.log_file.display());
        std::process::exit(1);
    }

    let Err(err) = run(&config, &args);
    log::error!("{prog}: {err:#}");
    log::logger().flush();
    std::process::exit(1);
}

/// Only returns when something went wrong, on success the process image is
/// replaced by the runtime.
fn run(config: &Config, args: &[OsString]) -> anyhow::Result<Infallible> {
    log::info!("Running {args:?}");

    let invocation = Invocation::parse(args).context("can't parse arguments")?;
    hook::prepare(&invocation, &ResourceCatalog::sgx(), &HostDevices)
        .context("add SGX resources to OCI spec")?;

    let runtime = launcher::find_runtime(&config.runtimes).context("find runtime path")?;
    Err(launcher::exec(&runtime, args)).context("exec runtime binary")
}
