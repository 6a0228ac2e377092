//! Per-port TCP broadcast server.
//!
//! One event-loop thread multiplexes accept-readiness on the listening
//! socket, read-readiness on every connected client (whose data we discard
//! — the protocol is publish-only) and write-readiness on clients with a
//! pending send queue, alongside a periodic `produce()` callback, all on
//! `nix::poll`. Uses `std::time::Instant` for the production interval so
//! idle time still advances the clock.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsFd;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{debug, info, warn};

/// A connected client and whatever output is still waiting to reach it.
///
/// `send_queue == None` means "idle": the next produced payload is written
/// inline. `Some(queue)` means a previous send didn't complete inline (or a
/// payload arrived while one was still draining), and delivery is FIFO from
/// here until the queue empties again.
struct Client {
    stream: TcpStream,
    send_queue: Option<VecDeque<Vec<u8>>>,
    dead: bool,
}

/// A per-port broadcast server. The constructor spawns the event loop
/// on a dedicated thread and returns immediately; the thread runs for the
/// lifetime of the process.
pub struct BroadcastServer {
    _handle: std::thread::JoinHandle<()>,
}

impl BroadcastServer {
    /// `produce` is called once per `interval` whenever at least one client
    /// is connected; its return value is enqueued to every client.
    /// `on_connect_change` is notified with the new client count whenever a
    /// client connects or disconnects.
    pub fn new<P, C>(port: u16, interval: Duration, mut produce: P, mut on_connect_change: C) -> std::io::Result<Self>
    where
        P: FnMut() -> Vec<u8> + Send + 'static,
        C: FnMut(usize) + Send + 'static,
    {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        info!(port, "broadcast server listening");

        let handle = std::thread::spawn(move || {
            event_loop(listener, interval, &mut produce, &mut on_connect_change);
        });

        Ok(BroadcastServer { _handle: handle })
    }
}

fn event_loop(
    listener: TcpListener,
    interval: Duration,
    produce: &mut dyn FnMut() -> Vec<u8>,
    on_connect_change: &mut dyn FnMut(usize),
) {
    let mut clients: Vec<Client> = Vec::new();
    let mut last_produce = Instant::now();

    loop {
        let timeout = interval.saturating_sub(last_produce.elapsed());
        let timeout_ms = timeout.as_millis().min(u16::MAX as u128) as u16;

        let mut fds: Vec<PollFd> = Vec::with_capacity(1 + clients.len());
        fds.push(PollFd::new(listener.as_fd(), PollFlags::POLLIN));
        for client in &clients {
            let mut flags = PollFlags::POLLIN;
            if client.send_queue.is_some() {
                flags |= PollFlags::POLLOUT;
            }
            fds.push(PollFd::new(client.stream.as_fd(), flags));
        }

        match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!(error = %e, "poll failed in broadcast event loop");
                continue;
            }
        }

        // The production timer resets on every expiry, even when zero
        // clients means nothing is actually sent.
        if last_produce.elapsed() >= interval {
            last_produce = Instant::now();
            if !clients.is_empty() {
                let output = produce();
                for client in &mut clients {
                    send_or_queue(client, &output);
                }
            }
        }

        if let Some(revents) = fds[0].revents() {
            if revents.contains(PollFlags::POLLIN) {
                accept_all(&listener, &mut clients, on_connect_change);
            }
        }

        for (client, pollfd) in clients.iter_mut().zip(fds.iter().skip(1)) {
            let Some(revents) = pollfd.revents() else { continue };

            if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL) {
                client.dead = true;
                continue;
            }

            if revents.contains(PollFlags::POLLIN) {
                let mut buf = [0u8; 1024];
                match client.stream.read(&mut buf) {
                    Ok(0) => client.dead = true,
                    Ok(_) => {} // publish-only protocol: discard whatever the client sent
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                    Err(_) => client.dead = true,
                }
            }

            if !client.dead && revents.contains(PollFlags::POLLOUT) {
                drain_queue(client);
            }
        }

        if clients.iter().any(|c| c.dead) {
            clients.retain(|c| !c.dead);
            on_connect_change(clients.len());
        }
    }
}

fn accept_all(listener: &TcpListener, clients: &mut Vec<Client>, on_connect_change: &mut dyn FnMut(usize)) {
    loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!(error = %e, "failed to set client socket non-blocking, dropping connection");
                    continue;
                }
                debug!(%addr, "broadcast client connected");
                clients.push(Client { stream, send_queue: None, dead: false });
                on_connect_change(clients.len());
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) => {
                warn!(error = %e, "accept failed");
                break;
            }
        }
    }
}

/// Attempt an inline send on an idle client, or append to its queue.
fn send_or_queue(client: &mut Client, payload: &[u8]) {
    if payload.is_empty() {
        return;
    }

    if client.send_queue.is_none() {
        match client.stream.write(payload) {
            Ok(n) if n == payload.len() => {
                client.send_queue = Some(VecDeque::new());
            }
            Ok(n) => {
                let mut queue = VecDeque::new();
                queue.push_back(payload[n..].to_vec());
                client.send_queue = Some(queue);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                let mut queue = VecDeque::new();
                queue.push_back(payload.to_vec());
                client.send_queue = Some(queue);
            }
            Err(_) => client.dead = true,
        }
    } else {
        client.send_queue.as_mut().unwrap().push_back(payload.to_vec());
    }
}

/// Drain one pending chunk from a client's queue on write-readiness,
/// removing the queue entirely once it's empty (no queue means nothing
/// pending, so the next send goes inline again).
fn drain_queue(client: &mut Client) {
    let Some(queue) = client.send_queue.as_mut() else { return };

    let Some(front) = queue.front().cloned() else {
        client.send_queue = None;
        return;
    };

    match client.stream.write(&front) {
        Ok(n) if n == front.len() => {
            queue.pop_front();
        }
        Ok(n) => {
            queue[0] = front[n..].to_vec();
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
        Err(_) => client.dead = true,
    }
}
