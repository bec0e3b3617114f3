use ordforge::environment::detect_with;
use ordforge::probe::ResolutionSource;

// Explicit overrides must win without a single probe call.
#[test]
fn test_explicit_overrides_skip_probing() {
    std::env::set_var("ORD_RPC_HOST", "mynode");
    std::env::set_var("BITCOIN_RPC_HOST", "mybitcoind");
    std::env::set_var("ORD_API_URL", "http://10.21.21.9:8080");
    std::env::set_var("ORDFORGE_LOCAL_IP", "10.21.21.2");

    let env = detect_with(|_| panic!("probe must not run when overrides are set"));

    assert_eq!(env.ord_container.value, "mynode");
    assert_eq!(env.ord_container.source, ResolutionSource::Explicit);
    assert_eq!(env.bitcoin_container.value, "mybitcoind");
    assert_eq!(env.bitcoin_container.source, ResolutionSource::Explicit);
    assert_eq!(env.ord_api_url.value, "http://10.21.21.9:8080");
    assert_eq!(env.ord_api_url.source, ResolutionSource::Explicit);
    assert_eq!(env.local_ip.value, "10.21.21.2");
    assert_eq!(env.local_ip.source, ResolutionSource::Explicit);
}
