//! Prober tests against mocked DoH providers and local sockets.

use dpi_client::{DohProvider, NetworkProber, ProbeConfig};
use dpi_core::{DnsFailure, Layer, Level, ReasonCode, RecordType, Target, TransportErrorKind};
use serde_json::json;
use std::net::{IpAddr, TcpListener};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(name: &str, server: &MockServer) -> DohProvider {
    DohProvider::new(name, format!("{}/resolve", server.uri()))
}

fn answer(name: &str, record_type: RecordType, data: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "Status": 0,
        "Answer": [{"name": name, "type": record_type.code(), "data": data}]
    }))
}

fn nxdomain() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"Status": 3}))
}

async fn mount_answer(server: &MockServer, name: &str, record_type: RecordType, data: &str) {
    Mock::given(method("GET"))
        .and(path("/resolve"))
        .and(query_param("name", name))
        .and(query_param("type", record_type.as_str()))
        .respond_with(answer(name, record_type, data))
        .mount(server)
        .await;
}

fn config(first: &MockServer, second: &MockServer) -> ProbeConfig {
    ProbeConfig::new()
        .providers(vec![provider("first", first), provider("second", second)])
        .dns_timeout(Duration::from_secs(2))
        .http_timeout(Duration::from_millis(500))
        .blackhole_timeout(Duration::from_millis(800))
}

/// A local port with nothing listening on it
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn providers_agreeing_on_ptr_are_not_spoofed() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mount_answer(&first, "example.com", RecordType::A, "192.0.2.10").await;
    mount_answer(&second, "example.com", RecordType::A, "192.0.2.11").await;
    mount_answer(&first, "10.2.0.192.in-addr.arpa", RecordType::Ptr, "web-1.example.net.").await;
    mount_answer(&first, "11.2.0.192.in-addr.arpa", RecordType::Ptr, "web-2.example.net.").await;

    let prober = NetworkProber::new(config(&first, &second)).unwrap();
    let result = prober.dns().resolve_forward("example.com").await;

    assert!(result.resolved);
    assert!(!result.spoofed);
    assert_eq!(result.addresses.len(), 2);
    assert_eq!(result.resolved_provider_count(), 2);

    let addr: IpAddr = "192.0.2.10".parse().unwrap();
    assert_eq!(result.reverse_domain_of(&addr), Some("web-1.example.net"));
    assert_eq!(result.ptr_by_address[&addr].provider.as_deref(), Some("first"));
}

#[tokio::test]
async fn disjoint_reverse_domains_flag_spoofing() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mount_answer(&first, "example.com", RecordType::A, "192.0.2.10").await;
    mount_answer(&second, "example.com", RecordType::A, "198.51.100.7").await;
    mount_answer(&first, "10.2.0.192.in-addr.arpa", RecordType::Ptr, "web.example.net.").await;
    mount_answer(&first, "7.100.51.198.in-addr.arpa", RecordType::Ptr, "sinkhole.isp.test.").await;

    let prober = NetworkProber::new(config(&first, &second)).unwrap();
    let result = prober.dns().resolve_forward("example.com").await;

    assert!(result.resolved);
    assert!(result.spoofed);
}

#[tokio::test]
async fn provider_error_stays_local() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mount_answer(&first, "example.com", RecordType::A, "192.0.2.10").await;
    Mock::given(method("GET"))
        .and(path("/resolve"))
        .and(query_param("type", "A"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&second)
        .await;

    let prober = NetworkProber::new(config(&first, &second)).unwrap();
    let result = prober.dns().resolve_forward("example.com").await;

    assert!(result.resolved);
    assert!(!result.spoofed);

    let failed = result.provider("second").unwrap();
    assert!(!failed.resolved);
    assert_eq!(failed.error, Some(DnsFailure::Status(500)));
    assert!(result.provider("first").unwrap().resolved);
}

#[tokio::test]
async fn empty_answers_are_not_resolved() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .and(path("/resolve"))
            .respond_with(nxdomain())
            .mount(server)
            .await;
    }

    let prober = NetworkProber::new(config(&first, &second)).unwrap();
    let result = prober.dns().resolve_forward("blocked.example").await;

    assert!(!result.resolved);
    assert!(!result.spoofed);
    assert!(result.addresses.is_empty());
    assert_eq!(
        result.provider("first").unwrap().error,
        Some(DnsFailure::NoRecords)
    );
}

#[tokio::test]
async fn reverse_lookup_falls_through_providers() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/resolve"))
        .respond_with(nxdomain())
        .mount(&first)
        .await;
    mount_answer(&second, "1.2.0.192.in-addr.arpa", RecordType::Ptr, "host.example.org.").await;

    let prober = NetworkProber::new(config(&first, &second)).unwrap();
    let ptr = prober.dns().resolve_reverse("192.0.2.1".parse().unwrap()).await;

    assert_eq!(ptr.query_name, "1.2.0.192.in-addr.arpa");
    assert_eq!(ptr.reverse_domain.as_deref(), Some("host.example.org"));
    assert_eq!(ptr.provider.as_deref(), Some("second"));
}

#[tokio::test]
async fn reverse_lookup_prefers_first_provider() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_answer(&first, "1.2.0.192.in-addr.arpa", RecordType::Ptr, "edge.example.net.").await;
    mount_answer(&second, "1.2.0.192.in-addr.arpa", RecordType::Ptr, "host.example.org.").await;

    let prober = NetworkProber::new(config(&first, &second)).unwrap();
    let ptr = prober.dns().resolve_reverse("192.0.2.1".parse().unwrap()).await;

    assert_eq!(ptr.reverse_domain.as_deref(), Some("edge.example.net"));
    assert_eq!(ptr.provider.as_deref(), Some("first"));
}

#[tokio::test]
async fn http_error_status_still_counts_as_connected() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;

    let dns = MockServer::start().await;
    let prober = NetworkProber::new(config(&dns, &dns)).unwrap();
    let target = Target::normalize(&site.uri());

    let http = prober.transport().probe_http(&target).await;
    assert_eq!(http.layer, Layer::Http);
    assert!(http.succeeded);
    assert_eq!(http.status_code, Some(404));

    let tls = prober.transport().probe_tls(&target).await;
    assert!(!tls.attempted);
    assert!(tls.skipped.is_some());
}

#[tokio::test]
async fn opaque_mode_hides_status() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&site)
        .await;

    let dns = MockServer::start().await;
    let prober = NetworkProber::new(
        config(&dns, &dns).inspection(dpi_client::InspectionMode::Opaque),
    )
    .unwrap();

    let http = prober
        .transport()
        .probe_http(&Target::normalize(&site.uri()))
        .await;
    assert!(http.succeeded);
    assert_eq!(http.status_code, None);
}

#[tokio::test]
async fn refused_connection_is_a_connect_failure() {
    let dns = MockServer::start().await;
    let prober = NetworkProber::new(config(&dns, &dns)).unwrap();
    let target = Target::normalize(&format!("http://127.0.0.1:{}", closed_port()));

    let http = prober.transport().probe_http(&target).await;
    assert!(http.attempted);
    assert!(!http.succeeded);
    assert_eq!(http.error_kind, Some(TransportErrorKind::Connect));
}

#[tokio::test]
async fn silent_server_times_out_and_blackholes_tls() {
    // Accepts TCP but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let dns = MockServer::start().await;
    let prober = NetworkProber::new(config(&dns, &dns)).unwrap();

    let http = prober
        .transport()
        .probe_http(&Target::normalize(&format!("http://127.0.0.1:{port}")))
        .await;
    assert!(!http.succeeded);
    assert_eq!(http.error_kind, Some(TransportErrorKind::Timeout));
    assert!(!http.blackholed);

    let tls = prober
        .transport()
        .probe_tls(&Target::normalize(&format!("https://127.0.0.1:{port}")))
        .await;
    assert_eq!(tls.layer, Layer::Tls);
    assert!(tls.attempted);
    assert!(tls.blackholed);
    assert!(!tls.succeeded);

    drop(listener);
}

#[tokio::test]
async fn fast_handshake_failure_is_not_a_blackhole() {
    // Plain HTTP server: the TLS handshake fails immediately.
    let site = MockServer::start().await;
    let dns = MockServer::start().await;
    let prober = NetworkProber::new(config(&dns, &dns)).unwrap();

    let address = site.uri().replacen("http://", "https://", 1);
    let tls = prober.transport().probe_tls(&Target::normalize(&address)).await;

    assert!(tls.attempted);
    assert!(!tls.succeeded);
    assert!(!tls.blackholed);
    assert!(tls.error_kind.is_some());
    assert_ne!(tls.error_kind, Some(TransportErrorKind::Timeout));
}

#[tokio::test]
async fn unreachable_ip_without_ptr_is_dns_block() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .and(path("/resolve"))
            .respond_with(nxdomain())
            .mount(server)
            .await;
    }

    let prober = NetworkProber::new(config(&first, &second)).unwrap();
    let target = Target::normalize(&format!("http://127.0.0.1:{}", closed_port()));
    let run = prober.probe(&target).await;

    assert_eq!(run.dns.record_type, RecordType::Ptr);
    assert!(!run.dns.resolved);
    assert!(!run.http.succeeded);
    assert!(!run.tls.attempted);
    assert_eq!(run.verdict.reason, ReasonCode::DnsBlock);
    assert_eq!(run.verdict.level, Level::Warning);
    assert_eq!(run.display_name(), "127.0.0.1");
}
