//! profile-lookup - resolve wallet profiles from the command line
//!
//! `profile-lookup <KEY>...` resolves every key and prints one JSON line per
//! key. `profile-lookup --watch` binds to keys read from stdin (and the
//! wallet in WALLET_PUBLIC_KEY) and prints every published state.

use std::env;
use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use wallet_profile::{
    derive_display_record, BindingInputs, BindingOptions, CivicProfileClient, ConnectionHandle,
    IdentityKey, ProfileBinding, ProfileError, ProfileResolver, ProfileSource, ProfileState,
    ResolverConfig, Result,
};

/// Resolve wallet profiles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read keys from stdin and print every published profile state
    #[arg(long, conflicts_with = "keys")]
    watch: bool,

    /// Base-58 wallet public keys to resolve
    #[arg(value_name = "PUBLIC_KEY", required_unless_present = "watch")]
    keys: Vec<IdentityKey>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing()?;

    let config = ResolverConfig::from_env();
    info!(service_url = %config.service_url, "Starting profile-lookup");

    let client = CivicProfileClient::from_config(&config)?;
    let resolver = Arc::new(ProfileResolver::with_config(client, &config.cache));

    if args.watch {
        return watch_stdin(&config, resolver).await;
    }

    lookup(&resolver, &args.keys, config.connection().as_ref()).await
}

fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("wallet_profile=info".parse()?);

    // stdout carries the JSON results, so logs go to stderr
    if env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    Ok(())
}

/// Resolve every key concurrently; repeated keys share one resolution
async fn lookup<S: ProfileSource + 'static>(
    resolver: &ProfileResolver<S>,
    keys: &[IdentityKey],
    connection: Option<&ConnectionHandle>,
) -> Result<()> {
    let lookups = keys
        .iter()
        .map(|key| async move { (key, resolver.resolve(key, connection).await) });

    let mut failed = 0;
    for (key, result) in join_all(lookups).await {
        match result {
            Ok(raw) => {
                let line = json!({ "key": key, "profile": derive_display_record(&raw) });
                println!("{}", serde_json::to_string(&line)?);
            }
            Err(e) => {
                error!(key = %key, error = %e, "Profile lookup failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(ProfileError::Resolution(format!(
            "{failed} of {} lookups failed",
            keys.len()
        )));
    }

    Ok(())
}

async fn watch_stdin(
    config: &ResolverConfig,
    resolver: Arc<ProfileResolver<CivicProfileClient>>,
) -> Result<()> {
    let wallet = env::var("WALLET_PUBLIC_KEY")
        .ok()
        .map(|k| k.parse::<IdentityKey>())
        .transpose()?;

    let (key_tx, key_rx) = watch::channel(None);
    let (wallet_tx, wallet_rx) = watch::channel(wallet);
    let (connection_tx, connection_rx) = watch::channel(config.connection());

    let binding = ProfileBinding::spawn(
        resolver,
        BindingInputs {
            key: key_rx,
            wallet: wallet_rx,
            connection: connection_rx,
        },
        BindingOptions {
            surface_failures: config.surface_failures,
        },
    );

    // Ends when the binding stops and its state channel closes
    let mut states = binding.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            let line = state_json(&states.borrow_and_update());
            println!("{line}");
            if states.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            key_tx.send_replace(None);
            continue;
        }
        match line.parse::<IdentityKey>() {
            Ok(key) => {
                key_tx.send_replace(Some(key));
            }
            Err(e) => warn!(error = %e, "Ignoring invalid key"),
        }
    }

    // Closing every provider lets the binding publish what is in flight
    drop(key_tx);
    drop(wallet_tx);
    drop(connection_tx);
    binding.join().await;

    if let Err(e) = printer.await {
        warn!(error = %e, "State printer failed");
    }
    Ok(())
}

fn state_json(state: &ProfileState) -> serde_json::Value {
    json!({
        "loading": state.is_loading(),
        "profile": state.profile(),
        "error": state.error().map(|e| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{BoxFuture, FutureExt};
    use wallet_profile::RawProfile;

    const ALICE: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    const BOB: &str = "So11111111111111111111111111111111111111112";

    /// Resolves every key except BOB
    struct FailsForBob;

    impl ProfileSource for FailsForBob {
        fn fetch(
            &self,
            key: &IdentityKey,
            _connection: Option<&ConnectionHandle>,
        ) -> BoxFuture<'static, Result<RawProfile>> {
            let fails = key.as_str() == BOB;
            async move {
                if fails {
                    Err(ProfileError::Resolution("service unavailable".to_string()))
                } else {
                    Ok(RawProfile::default())
                }
            }
            .boxed()
        }
    }

    #[test]
    fn test_args_parse_keys() {
        let args = Args::try_parse_from(["profile-lookup", ALICE, BOB]).unwrap();
        assert!(!args.watch);
        assert_eq!(args.keys.len(), 2);
        assert_eq!(args.keys[0].as_str(), ALICE);
    }

    #[test]
    fn test_args_parse_watch() {
        let args = Args::try_parse_from(["profile-lookup", "--watch"]).unwrap();
        assert!(args.watch);
        assert!(args.keys.is_empty());
    }

    #[test]
    fn test_args_require_keys_or_watch() {
        assert!(Args::try_parse_from(["profile-lookup"]).is_err());
    }

    #[test]
    fn test_args_reject_invalid_key() {
        assert!(Args::try_parse_from(["profile-lookup", "ABC123"]).is_err());
    }

    #[test]
    fn test_args_reject_watch_with_keys() {
        assert!(Args::try_parse_from(["profile-lookup", "--watch", ALICE]).is_err());
    }

    #[tokio::test]
    async fn test_lookup_succeeds_when_all_resolve() {
        let resolver = ProfileResolver::new(FailsForBob);
        let keys = vec![IdentityKey::parse(ALICE).unwrap()];
        assert!(lookup(&resolver, &keys, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_fails_when_any_key_fails() {
        let resolver = ProfileResolver::new(FailsForBob);
        let keys = vec![
            IdentityKey::parse(ALICE).unwrap(),
            IdentityKey::parse(BOB).unwrap(),
        ];

        let err = lookup(&resolver, &keys, None).await.unwrap_err();
        assert!(matches!(err, ProfileError::Resolution(ref m) if m == "1 of 2 lookups failed"));
    }
}
