mod helpers;

use helpers::{MockDnsServer, Replies};
use rdns_domain::config::ServerConfig;
use rdns_domain::{DnsQuery, RecordData, RecordType, ResultCode};
use rdns_infrastructure::dns::{EventLoop, RequestOptions, ResolverBuilder, TokioEngine};
use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(5);

fn event_loop(server: ServerConfig) -> EventLoop {
    let (engine, events) = TokioEngine::new();
    let resolver = ResolverBuilder::new(Box::new(engine))
        .with_server(server)
        .build()
        .unwrap();
    EventLoop::new(resolver, events)
}

#[tokio::test]
async fn test_resolves_over_udp() {
    LocalSet::new()
        .run_until(async {
            let server = MockDnsServer::start(false).await.unwrap();
            let mut event_loop = event_loop(ServerConfig::new("127.0.0.1", server.addr().port()));
            let replies = Replies::new();

            for i in 0..10 {
                event_loop
                    .resolver()
                    .submit(
                        DnsQuery::new(format!("host{}.example.com", i), RecordType::A),
                        replies.callback(),
                    )
                    .unwrap();
            }
            timeout(DEADLINE, event_loop.run_until_idle()).await.unwrap();

            assert_eq!(replies.len(), 10);
            for i in 0..10 {
                let reply = replies.get(i);
                assert_eq!(reply.code, ResultCode::NoError);
                assert_eq!(reply.entries[0].data, RecordData::A(Ipv4Addr::LOCALHOST));
            }
        })
        .await;
}

#[tokio::test]
async fn test_truncated_udp_falls_back_to_tcp() {
    LocalSet::new()
        .run_until(async {
            let server = MockDnsServer::start(true).await.unwrap();
            let mut event_loop = event_loop(ServerConfig::new("127.0.0.1", server.addr().port()));
            let replies = Replies::new();

            event_loop
                .resolver()
                .submit(DnsQuery::new("large.example.com", RecordType::A), replies.callback())
                .unwrap();
            timeout(DEADLINE, event_loop.run_until_idle()).await.unwrap();

            let reply = replies.get(0);
            assert_eq!(reply.code, ResultCode::NoError);
            assert_eq!(reply.entries.len(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_silent_server_times_out() {
    LocalSet::new()
        .run_until(async {
            let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
            let port = silent.local_addr().unwrap().port();
            let mut event_loop = event_loop(ServerConfig::new("127.0.0.1", port));
            let replies = Replies::new();

            event_loop
                .resolver()
                .submit_with(
                    DnsQuery::new("example.com", RecordType::A),
                    RequestOptions::new(Duration::from_millis(50), 1),
                    replies.callback(),
                )
                .unwrap();
            timeout(DEADLINE, event_loop.run_until_idle()).await.unwrap();

            assert_eq!(replies.get(0).code, ResultCode::Timeout);
            let mut buf = [0u8; 512];
            silent.set_nonblocking(true).unwrap();
            let mut received = 0;
            while silent.recv_from(&mut buf).is_ok() {
                received += 1;
            }
            assert_eq!(received, 2);
        })
        .await;
}
