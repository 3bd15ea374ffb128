//! Integration test for the secondary datagram listener

use std::time::Duration;

use ocd_bridge::udp;
use ocd_core::DatagramConfig;
use serial_test::serial;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[tokio::test]
#[serial]
async fn spawned_listener_echoes_datagrams() {
    let task = udp::spawn(DatagramConfig { port: 18099 });
    // give the task a moment to bind
    tokio::time::sleep(Duration::from_millis(200)).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"hello bridge", "127.0.0.1:18099").await.unwrap();

    let mut buf = [0u8; 64];
    let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
        .await
        .expect("timed out waiting for datagram echo")
        .unwrap();
    assert_eq!(&buf[..len], b"hello bridge");

    task.abort();
}
