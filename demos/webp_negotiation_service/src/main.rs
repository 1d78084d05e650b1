use fastly::http::StatusCode;
use fastly::{ConfigStore, Request, Response};
use log::{error, info, warn};
use webp_negotiation::{Configuration, Negotiator, SendErrorPolicy};

const CONFIG_STORE_NAME: &str = "webp_negotiation";

const DEFAULT_BACKEND: &str = "origin";

// Settings come from the config store when it exists, defaults otherwise.
fn load_configuration() -> Configuration {
    let config = Configuration::default().with_backend(DEFAULT_BACKEND);

    let store = match ConfigStore::try_open(CONFIG_STORE_NAME) {
        Ok(store) => store,
        Err(err) => {
            info!("config store `{CONFIG_STORE_NAME}` not available, using defaults: {err}");
            return config;
        }
    };

    let mut config = match store.get("backend") {
        Some(backend) => config.with_backend(backend),
        None => config,
    };
    if let Some(prefix) = store.get("path_prefix") {
        config = config.with_path_prefix(prefix);
    }
    if let Some(pattern) = store.get("accept_pattern") {
        config = match config.clone().with_accept_pattern(&pattern) {
            Ok(updated) => updated,
            Err(err) => {
                warn!("ignoring accept_pattern `{pattern}`: {err}");
                config
            }
        };
    }
    match store.get("on_substitute_error").as_deref() {
        Some("propagate") => config.with_send_error_policy(SendErrorPolicy::Propagate),
        Some("fallback") | None => config.with_send_error_policy(SendErrorPolicy::Fallback),
        Some(other) => {
            warn!("ignoring unknown on_substitute_error `{other}`");
            config
        }
    }
}

fn main() {
    env_logger::builder()
        .filter(None, log::LevelFilter::Info)
        .init();

    let req = Request::from_client();
    let method = req.get_method_str().to_string();
    let path = req.get_path().to_string();

    let negotiator = Negotiator::new(load_configuration());

    match negotiator.handle_with_outcome(req, None) {
        Ok((resp, outcome)) => {
            info!("{method} {path} -> {} ({outcome:?})", resp.get_status());
            resp.send_to_client();
        }
        Err(err) => {
            error!("error serving {method} {path}: {err}");
            Response::from_status(StatusCode::BAD_GATEWAY).send_to_client();
        }
    }
}
