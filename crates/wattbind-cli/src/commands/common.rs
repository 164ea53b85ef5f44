//! Shared command context and identity resolution.

use wattbind_core::{
    BindingDb, CampusApi, ChatIdentity, Config, CoreError, HistoryDb, RateLimiter,
    ValidationError,
};

/// Everything a command needs: configuration, stores, and the upstream
/// client.
pub struct Ctx {
    pub config: Config,
    pub api: CampusApi,
    pub history: HistoryDb,
    pub bindings: BindingDb,
    pub limiter: RateLimiter,
}

/// Open stores and build the upstream client from configuration.
pub fn open_ctx() -> Result<Ctx, CoreError> {
    let config = Config::load_or_default();
    let api = CampusApi::new(&config.upstream)?;
    let history = HistoryDb::open()?;
    let bindings = BindingDb::open()?;
    let limiter = RateLimiter::open(config.rate_limit.window_secs, config.rate_limit.threshold)?;
    Ok(Ctx {
        config,
        api,
        history,
        bindings,
        limiter,
    })
}

/// Exactly one of `--user` / `--group` must identify the caller.
pub fn resolve_identity(
    user: &Option<String>,
    group: &Option<String>,
) -> Result<ChatIdentity, ValidationError> {
    match (user, group) {
        (Some(id), None) => Ok(ChatIdentity::User(id.clone())),
        (None, Some(id)) => Ok(ChatIdentity::Group(id.clone())),
        _ => Err(ValidationError::BadArgs(
            "supply exactly one of --user <id> or --group <id>".into(),
        )),
    }
}
