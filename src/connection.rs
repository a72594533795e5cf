//! A socket wrapped for single-writer-at-a-time sends.
//!
//! The reference server gives each `Connection` its own mutex so that a
//! broadcast thread and the owning connection's own reply never interleave
//! their writes on the same file descriptor. `Connection` here plays the
//! same role around a `TcpStream`: reads happen on the owning thread only
//! (no lock needed), writes take the mutex so any thread holding a `Room`
//! lock can push an unsolicited message (a peer's move, a room update) to a
//! socket it doesn't otherwise own.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Mutex;

use crate::protocol::{self, Request, Response};

pub struct Connection {
    /// Owned by the connection's session thread; reads never contend with
    /// a send from another thread.
    reader: Mutex<TcpStream>,
    /// A second handle to the same socket, for sends issued by any thread
    /// holding a room lock (a peer's move, a room update).
    writer: Mutex<TcpStream>,
    peer_addr: SocketAddr,
}

impl Connection {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        let writer = stream.try_clone()?;
        Ok(Connection {
            reader: Mutex::new(stream),
            writer: Mutex::new(writer),
            peer_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Send a response, serialized against any concurrent sender on this
    /// connection.
    pub fn send(&self, response: &Response) -> protocol::Result<()> {
        let mut stream = self.writer.lock().unwrap();
        response.write(&mut *stream)
    }

    /// Read one request. Only the connection's own session thread calls
    /// this, so the reader lock is never contended; it exists so `reader`
    /// can live behind the same interior-mutability story as `writer`.
    pub fn recv(&self) -> protocol::Result<Request> {
        let mut stream = self.reader.lock().unwrap();
        Request::read(&mut *stream)
    }

    /// Client-side counterpart of `send`: write a `Request` to the server.
    pub fn send_request(&self, request: &Request) -> protocol::Result<()> {
        let mut stream = self.writer.lock().unwrap();
        request.write(&mut *stream)
    }

    /// Client-side counterpart of `recv`: read one `Response` from the
    /// server. Only the decode worker calls this.
    pub fn recv_response(&self) -> protocol::Result<Response> {
        let mut stream = self.reader.lock().unwrap();
        Response::read(&mut *stream)
    }

    pub fn shutdown(&self) {
        if let Ok(stream) = self.writer.lock() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}
