//! Shared helpers for integration tests that talk to the mock backend.

#![allow(dead_code)]

use std::net::SocketAddr;

/// Start a fresh mock backend on a random port and return its `/api` base URL.
///
/// The listener is bound before this returns, so requests made right away
/// queue in the accept backlog instead of being refused. Each call gets its
/// own in-memory store.
pub fn spawn_backend() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/api")
}

/// An address nothing listens on.
pub fn dead_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
