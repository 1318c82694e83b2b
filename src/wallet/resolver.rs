use tracing::debug;

use crate::error::WalletError;
use crate::wallet::provider::{ProviderInfo, WalletKind};

/// Picks the provider to connect to for `kind`.
///
/// Exact name among ready providers wins, then a case-insensitive substring
/// among ready providers. A substring hit on a provider that is not ready is
/// reported as such; anything else is "not found".
pub fn resolve<'a>(kind: WalletKind, providers: &'a [ProviderInfo]) -> Result<&'a ProviderInfo, WalletError> {
    debug!(
        "Available wallets: {:?}",
        providers
            .iter()
            .map(|p| (p.name.as_str(), p.ready_state))
            .collect::<Vec<_>>()
    );

    if providers.is_empty() {
        return Err(WalletError::NoProviders);
    }

    let wanted = kind.adapter_name();
    let wanted_lower = wanted.to_lowercase();
    let contains_wanted = |p: &ProviderInfo| p.name.to_lowercase().contains(&wanted_lower);

    if let Some(exact) = providers.iter().find(|p| p.is_ready() && p.name == wanted) {
        return Ok(exact);
    }

    if let Some(partial) = providers.iter().find(|p| p.is_ready() && contains_wanted(p)) {
        return Ok(partial);
    }

    match providers.iter().find(|p| contains_wanted(p)) {
        Some(not_ready) => Err(WalletError::NotReady {
            kind,
            state: not_ready.ready_state,
        }),
        None => Err(WalletError::NotFound { kind }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::provider::ReadyState;

    fn provider(name: &str, state: ReadyState) -> ProviderInfo {
        ProviderInfo::new(name, state)
    }

    #[test]
    fn empty_list_means_no_providers() {
        assert_eq!(resolve(WalletKind::Petra, &[]), Err(WalletError::NoProviders));
    }

    #[test]
    fn exact_match_beats_earlier_substring_match() {
        let providers = vec![
            provider("Petra Mobile", ReadyState::Installed),
            provider("Petra", ReadyState::Installed),
        ];
        let chosen = resolve(WalletKind::Petra, &providers).unwrap();
        assert_eq!(chosen.name, "Petra");
    }

    #[test]
    fn falls_back_to_case_insensitive_substring() {
        let providers = vec![
            provider("Nightly", ReadyState::Installed),
            provider("martian wallet", ReadyState::Installed),
        ];
        let chosen = resolve(WalletKind::Martian, &providers).unwrap();
        assert_eq!(chosen.name, "martian wallet");
    }

    #[test]
    fn ready_substring_preferred_over_not_ready_exact() {
        let providers = vec![
            provider("Pontem", ReadyState::Loadable),
            provider("Pontem Wallet", ReadyState::Installed),
        ];
        let chosen = resolve(WalletKind::Pontem, &providers).unwrap();
        assert_eq!(chosen.name, "Pontem Wallet");
    }

    #[test]
    fn present_but_not_ready_reports_state() {
        let providers = vec![
            provider("Petra", ReadyState::Installed),
            provider("Rise", ReadyState::NotDetected),
        ];
        let err = resolve(WalletKind::Rise, &providers).unwrap_err();
        assert_eq!(
            err,
            WalletError::NotReady {
                kind: WalletKind::Rise,
                state: ReadyState::NotDetected
            }
        );
        assert!(err.to_string().contains("rise wallet was found but is not ready (state: NotDetected)"));
    }

    #[test]
    fn no_substring_anywhere_is_never_a_match() {
        let providers = vec![
            provider("Petra", ReadyState::Installed),
            provider("Martian", ReadyState::Installed),
            provider("Nightly", ReadyState::Loadable),
        ];
        for kind in [WalletKind::Pontem, WalletKind::Rise, WalletKind::Other] {
            assert_eq!(resolve(kind, &providers), Err(WalletError::NotFound { kind }));
        }
    }
}
