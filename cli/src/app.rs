//! Application assembly: merge CLI overrides into config, start the main
//! context and publish the redirect context for the process.
use outfeed_core::api::{main_queue, AppConfig, Passthrough, RedirectContext};

use crate::commands::cli::Args;
use crate::error::CliError;

pub struct App {
    pub cfg: AppConfig,
    pub ctx: &'static RedirectContext,
    pub quiet: bool,
}

pub fn apply_overrides(cfg: &mut AppConfig, args: &Args) {
    if let Some(hook) = args.hook {
        cfg.redirect.hook = hook.into();
    }
    if args.tee {
        cfg.redirect.passthrough = Passthrough::Tee;
    }
}

impl App {
    #[tracing::instrument(name = "cli.app_start", skip_all)]
    pub fn start(cfg: AppConfig, quiet: bool) -> Result<Self, CliError> {
        let (queue, main) = main_queue();
        // The loop lives as long as the process; its handle is not joined.
        let _main = main.spawn("outfeed-main")?;
        let ctx = RedirectContext::new(&cfg.redirect, queue)?.install_global()?;
        tracing::info!(
            hook = ?cfg.redirect.hook,
            passthrough = ?cfg.redirect.passthrough,
            "redirect context ready"
        );
        Ok(Self { cfg, ctx, quiet })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use outfeed_core::api::HookKind;

    #[test]
    fn cli_flags_override_config() {
        let args = Args::try_parse_from(["outfeed", "--hook", "fd", "--tee", "demo"]).unwrap();
        let mut cfg = AppConfig::default();
        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg.redirect.hook, HookKind::Fd);
        assert_eq!(cfg.redirect.passthrough, Passthrough::Tee);
    }

    #[test]
    fn config_kept_without_flags() {
        let args = Args::try_parse_from(["outfeed", "demo"]).unwrap();
        let mut cfg = AppConfig::default();
        cfg.redirect.passthrough = Passthrough::Tee;
        apply_overrides(&mut cfg, &args);
        assert_eq!(cfg.redirect.hook, HookKind::Writer);
        assert_eq!(cfg.redirect.passthrough, Passthrough::Tee);
    }
}
