//! Utility functions: tracing, HTML escape, host resolution.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize pretty CLI logging.
pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  fmt()
    .with_env_filter(filter)
    .with_target(false)
    .pretty()
    .init();
}

/// Minimal HTML escaping for mail bodies.
pub fn html_escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

/// A source of a host name. `None` or an empty string means "ask the next one".
pub type HostResolver<'a> = Box<dyn Fn() -> Option<String> + 'a>;

/// First non-empty answer of the resolvers, tried in order.
pub fn resolve_first(resolvers: &[HostResolver<'_>]) -> Option<String> {
  resolvers
    .iter()
    .filter_map(|resolve| resolve())
    .map(|host| host.trim().to_string())
    .find(|host| !host.is_empty())
}

/// Host name from the process environment.
pub fn env_hostname() -> Option<String> {
  std::env::var("HOSTNAME").ok()
}

/// Host name reported by the operating system.
pub fn local_hostname() -> Option<String> {
  let name = gethostname::gethostname();
  match name.into_string() {
    Ok(name) => Some(name),
    Err(raw) => {
      warn!("ignoring non UTF-8 hostname {raw:?}");
      None
    }
  }
}

/// Resolve a host: explicit value, configured default, environment, OS.
pub fn resolve_host(explicit: Option<&str>, configured: Option<&str>) -> String {
  let chain: [HostResolver<'_>; 4] = [
    Box::new(|| explicit.map(str::to_string)),
    Box::new(|| configured.map(str::to_string)),
    Box::new(env_hostname),
    Box::new(local_hostname),
  ];
  resolve_first(&chain).unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escapes_markup() {
    assert_eq!(
      html_escape(r#"<b a="1">&</b>"#),
      "&lt;b a=&quot;1&quot;&gt;&amp;&lt;/b&gt;"
    );
  }

  #[test]
  fn first_non_empty_resolver_wins() {
    let chain: Vec<HostResolver<'_>> = vec![
      Box::new(|| None),
      Box::new(|| Some("   ".to_string())),
      Box::new(|| Some("web-1".to_string())),
      Box::new(|| panic!("resolvers after a hit are not consulted")),
    ];
    assert_eq!(resolve_first(&chain).as_deref(), Some("web-1"));
  }

  #[test]
  fn empty_chain_resolves_nothing() {
    let chain: Vec<HostResolver<'_>> = vec![Box::new(|| None)];
    assert_eq!(resolve_first(&chain), None);
  }

  #[test]
  fn explicit_host_beats_configuration() {
    assert_eq!(resolve_host(Some("api"), Some("cfg")), "api");
    assert_eq!(resolve_host(None, Some("cfg")), "cfg");
    assert_eq!(resolve_host(Some(""), Some("cfg")), "cfg");
    assert!(!resolve_host(None, None).is_empty());
  }
}
