//! Integration tests for common strict CSP workflows.
//!
//! These tests follow a page from render time, where hashes are collected,
//! to request time, where the policy header is derived.

use std::sync::Arc;
use strictcsp::prelude::*;

// =============================================================================
// Static rendering
// =============================================================================

fn render_static_page(store: &dyn ManifestStore, route: &str) -> CspManifest {
    let crypto: Arc<dyn CspCrypto> = Arc::new(CryptoProvider::new());
    let mut collector = HashCollector::new(route);

    {
        let mut transform = collector.transform(crypto);
        transform
            .transform_scripts(vec![
                ScriptDescriptor::inline("window.__DATA__ = {};"),
                ScriptDescriptor::external("/static/app.js").with_integrity("sha384-appdigest"),
            ])
            .unwrap();
        transform
            .transform_styles(vec![
                StyleDescriptor::element("body { margin: 0 }"),
                StyleDescriptor::attribute("display: none"),
            ])
            .unwrap();
    }

    collector.flush(store, DEFAULT_LOCK_TIMEOUT).unwrap()
}

#[test]
fn test_static_route_uses_manifest_hashes() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn ManifestStore> = Arc::new(FileManifestStore::new(dir.path()).unwrap());
    let manifest = render_static_page(store.as_ref(), "/docs/intro");

    let cache = ManifestCache::new(Arc::clone(&store));
    let base = CspBuilder::from_header_value(
        "default-src 'self'; style-src 'self' 'unsafe-inline'; object-src 'none'",
    );

    let finalized = StrictCspPolicy::new()
        .finalize_route(
            base,
            "/docs/intro",
            RenderMode::Static,
            &cache,
            ClientCapabilities::modern(),
        )
        .unwrap();

    assert_eq!(finalized.strategy, StrictStrategy::Hashes);
    assert!(finalized.nonce.is_none());

    let builder = &finalized.builder;
    for hash in manifest.script_hashes() {
        assert!(builder.has_directive_with_pattern("script-src", hash.as_str()));
    }
    assert!(builder.has_directive_with_pattern("script-src", "sha384-appdigest"));
    assert!(builder.has_directive_with_pattern("style-src", "unsafe-hashes"));
    assert!(!builder.has_directive_with_pattern("style-src", "unsafe-inline"));
    assert_eq!(cache.len(), 1);

    let scripts = manifest.script_hashes();
    let expected = format!(
        "default-src 'self'; style-src 'self' 'unsafe-hashes' '{}' '{}'; object-src 'none'; \
         script-src 'strict-dynamic' https: 'unsafe-inline' '{}' '{}';",
        manifest.styles.elem[0], manifest.styles.attr[0], scripts[0], scripts[1]
    );
    assert_eq!(builder.to_header_value(), expected);
}

#[test]
fn test_static_route_without_manifest_falls_back_to_nonce() {
    let store: Arc<dyn ManifestStore> = Arc::new(MemoryManifestStore::new());
    let cache = ManifestCache::new(store);

    let finalized = StrictCspPolicy::new()
        .finalize_route(
            CspBuilder::new(),
            "/never-rendered",
            RenderMode::Static,
            &cache,
            ClientCapabilities::modern(),
        )
        .unwrap();

    assert_eq!(finalized.strategy, StrictStrategy::Nonce);
    assert!(finalized.nonce.is_some());
    assert!(cache.is_empty());
}

// =============================================================================
// Dynamic rendering
// =============================================================================

#[test]
fn test_dynamic_route_stamps_nonce() {
    let finalized = StrictCspPolicy::new()
        .finalize(
            CspBuilder::from_header_value("style-src 'self'"),
            RenderMode::Dynamic,
            None,
            ClientCapabilities::modern(),
        )
        .unwrap();

    let nonce = finalized.nonce.clone().unwrap();
    let mut transform = NonceTransform::new(nonce.clone());
    let scripts = transform
        .transform_scripts(vec![ScriptDescriptor::inline("hydrate()")])
        .unwrap();
    assert_eq!(scripts[0].nonce.as_deref(), Some(nonce.as_str()));

    let source = format!("nonce-{}", nonce);
    let builder = &finalized.builder;
    assert!(builder.has_directive_with_pattern("script-src", source.as_str()));
    assert!(builder.has_directive_with_pattern("style-src", source.as_str()));
    assert!(builder.to_header_value().contains(&format!("'{}'", source)));
}

#[test]
fn test_each_request_gets_a_fresh_nonce() {
    let policy = StrictCspPolicy::new();
    let finalize = || {
        policy
            .finalize(
                CspBuilder::new(),
                RenderMode::Dynamic,
                None,
                ClientCapabilities::modern(),
            )
            .unwrap()
            .nonce
            .unwrap()
    };

    assert_ne!(finalize(), finalize());
}

#[test]
fn test_legacy_client_drops_strict_dynamic() {
    let mut manifest = CspManifest::new();
    manifest.add_script(strictcsp::ScriptEntry::inline("sha256-abc"));

    let finalized = StrictCspPolicy::new()
        .finalize(
            CspBuilder::new(),
            RenderMode::Static,
            Some(&manifest),
            ClientCapabilities::modern().with_strict_dynamic(false),
        )
        .unwrap();

    assert_eq!(
        finalized.builder.to_header_value(),
        "script-src https: 'unsafe-inline' 'sha256-abc';"
    );
}

// =============================================================================
// Header round trips
// =============================================================================

#[test]
fn test_report_only_rollout() {
    let incoming = "default-src 'self'; report-uri /csp-report";
    let base = CspBuilder::from_header_key_value(CSP_HEADER_REPORT_ONLY, incoming);

    let finalized = StrictCspPolicy::new()
        .finalize(
            base,
            RenderMode::Dynamic,
            None,
            ClientCapabilities::modern(),
        )
        .unwrap();

    let (name, value) = finalized.to_header_key_value();
    assert_eq!(name, CSP_HEADER_REPORT_ONLY);
    assert!(value.starts_with("default-src 'self'; report-uri /csp-report; script-src"));

    let enforced = finalized.builder.with_report_only(false);
    assert_eq!(enforced.header_name(), CSP_HEADER);
}

#[test]
fn test_extend_script_src_keeps_existing_sources() {
    let policy = StrictCspPolicy::new().with_options(strictcsp::StrictDynamicOptions {
        fallback: vec!["https:".to_string()],
        extend_script_src: true,
    });

    let mut manifest = CspManifest::new();
    manifest.add_script(strictcsp::ScriptEntry::inline("sha256-abc"));

    let finalized = policy
        .finalize(
            CspBuilder::from_header_value("script-src 'self'"),
            RenderMode::Static,
            Some(&manifest),
            ClientCapabilities::modern(),
        )
        .unwrap();

    assert_eq!(
        finalized.builder.to_header_value(),
        "script-src 'self' 'strict-dynamic' https: 'sha256-abc';"
    );
}

// =============================================================================
// Configuration
// =============================================================================

#[cfg(feature = "config")]
#[test]
fn test_policy_from_config() {
    let config = StrictCspConfig::from_toml_str(
        r#"
        hash_algorithm = "sha512"
        fallback = ["https:"]
        directives = "style-src 'self' 'unsafe-inline'"
        report_only = true

        [styles]
        mode = "enabled"
        remove_unsafe_inline = false
    "#,
    )
    .unwrap();

    let policy = StrictCspPolicy::from(&config);
    assert_eq!(policy.crypto().algorithm(), strictcsp::HashAlgorithm::Sha512);

    let mut manifest = CspManifest::new();
    manifest.add_script(strictcsp::ScriptEntry::inline("sha512-script"));
    manifest.add_style_elem("sha512-style");

    let finalized = policy
        .finalize(
            config.base_builder(),
            RenderMode::Static,
            Some(&manifest),
            ClientCapabilities::modern(),
        )
        .unwrap();

    assert!(finalized.builder.is_report_only());
    assert_eq!(
        finalized.builder.to_header_value(),
        "style-src 'self' 'unsafe-inline' 'sha512-style'; \
         script-src 'strict-dynamic' https: 'sha512-script';"
    );
}
