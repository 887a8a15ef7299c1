use std::time::Duration;

use crossbeam::channel::{RecvTimeoutError, TryRecvError};

use super::*;
use crate::actor::messages::RELOAD_PAYLOAD;

fn client(capacity: usize) -> (Sender<String>, Receiver<String>) {
    channel::bounded(capacity)
}

#[test]
fn test_broadcast_reaches_every_client() {
    let (mut hub, _handle) = HubActor::new(Shutdown::new());
    let (tx_a, rx_a) = client(4);
    let (tx_b, rx_b) = client(4);
    hub.handle(HubMsg::Register { id: 1, tx: tx_a });
    hub.handle(HubMsg::Register { id: 2, tx: tx_b });

    hub.handle(HubMsg::Broadcast(RELOAD_PAYLOAD.into()));

    assert_eq!(rx_a.try_recv().unwrap(), "update");
    assert_eq!(rx_b.try_recv().unwrap(), "update");
    assert_eq!(hub.clients.len(), 2);
}

#[test]
fn test_closed_client_is_evicted_others_still_served() {
    let (mut hub, _handle) = HubActor::new(Shutdown::new());
    let (tx_a, rx_a) = client(4);
    let (tx_dead, rx_dead) = client(4);
    let (tx_c, rx_c) = client(4);
    hub.handle(HubMsg::Register { id: 1, tx: tx_a });
    hub.handle(HubMsg::Register { id: 2, tx: tx_dead });
    hub.handle(HubMsg::Register { id: 3, tx: tx_c });
    drop(rx_dead);

    assert_eq!(hub.broadcast("update"), 2);
    assert!(!hub.clients.contains_key(&2));
    assert_eq!(rx_a.try_recv().unwrap(), "update");
    assert_eq!(rx_c.try_recv().unwrap(), "update");

    // Later broadcasts keep flowing to the survivors.
    hub.handle(HubMsg::Broadcast("update".into()));
    assert_eq!(rx_a.try_recv().unwrap(), "update");
    assert_eq!(rx_c.try_recv().unwrap(), "update");
    assert_eq!(hub.clients.len(), 2);
}

#[test]
fn test_full_client_is_evicted() {
    let (mut hub, _handle) = HubActor::new(Shutdown::new());
    let (tx, rx) = client(1);
    hub.handle(HubMsg::Register { id: 7, tx });

    assert_eq!(hub.broadcast("update"), 1);
    assert_eq!(hub.broadcast("update"), 0);
    assert!(hub.clients.is_empty());

    // The queued payload is still readable, then the queue reports closed.
    assert_eq!(rx.try_recv().unwrap(), "update");
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));
}

#[test]
fn test_unregister_unknown_is_noop() {
    let (mut hub, _handle) = HubActor::new(Shutdown::new());
    let (tx, _rx) = client(1);
    hub.handle(HubMsg::Register { id: 1, tx });
    hub.handle(HubMsg::Unregister(99));
    hub.handle(HubMsg::Unregister(1));
    assert!(hub.clients.is_empty());
}

#[tokio::test]
async fn test_handle_round_trip_and_shutdown() {
    let shutdown = Shutdown::new();
    let (hub, handle) = HubActor::new(shutdown.clone());
    let task = tokio::spawn(hub.run());

    let (id_a, rx_a) = handle.register().await.unwrap();
    let (id_b, rx_b) = handle.register().await.unwrap();
    assert_ne!(id_a, id_b);

    assert!(handle.broadcast(RELOAD_PAYLOAD).await);
    let got = tokio::task::spawn_blocking(move || {
        let a = rx_a.recv_timeout(Duration::from_secs(1));
        let b = rx_b.recv_timeout(Duration::from_secs(1));
        (a, b, rx_a, rx_b)
    })
    .await
    .unwrap();
    assert_eq!(got.0.as_deref(), Ok("update"));
    assert_eq!(got.1.as_deref(), Ok("update"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();

    // Every client queue is dropped and the handle reports the hub as gone.
    let (_, _, rx_a, _) = got;
    assert_eq!(
        rx_a.recv_timeout(Duration::from_millis(100)),
        Err(RecvTimeoutError::Disconnected)
    );
    assert!(!handle.broadcast(RELOAD_PAYLOAD).await);
    assert!(handle.register().await.is_none());
}

#[test]
fn test_blocking_register_from_plain_thread() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let shutdown = Shutdown::new();
    let (hub, handle) = HubActor::new(shutdown.clone());
    let task = runtime.spawn(hub.run());

    let thread_handle = handle.clone();
    let worker = std::thread::spawn(move || {
        let (id, rx) = thread_handle.register_blocking().unwrap();
        let payload = rx.recv_timeout(Duration::from_secs(2));
        thread_handle.unregister_blocking(id);
        payload
    });

    runtime.block_on(async {
        // Keep broadcasting until the thread's registration has landed.
        while !worker.is_finished() {
            handle.broadcast(RELOAD_PAYLOAD).await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        shutdown.trigger();
        task.await.unwrap();
    });

    assert_eq!(worker.join().unwrap().as_deref(), Ok("update"));
}
