use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::error::DebugError;
use crate::wire;
use crate::wire::command;
use crate::wire::EventBatch;
use crate::wire::IdSizes;
use crate::wire::Location;
use crate::wire::Modifier;
use crate::wire::PacketHeader;
use crate::wire::PayloadReader;
use crate::wire::PayloadWriter;

/// A method of the debuggee's main class.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub id: u64,
    pub name: String,
    pub signature: String,
    pub mod_bits: u32,
}

type PendingMap = Mutex<HashMap<u32, oneshot::Sender<Result<Vec<u8>, DebugError>>>>;

/// One attached protocol connection.
///
/// Commands may be issued from any task; a background read task owns
/// the socket's read half, routes replies back to their callers, and
/// pushes composite events into the channel handed out by
/// [`JdwpClient::connect`]. The channel closing means the connection
/// is gone.
pub struct JdwpClient {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Arc<PendingMap>,
    next_id: AtomicU32,
    sizes: Arc<RwLock<IdSizes>>,
}

impl JdwpClient {
    /// Connect and perform the protocol handshake.
    pub async fn connect(
        host: &str,
        port: u16,
    ) -> Result<(Self, mpsc::UnboundedReceiver<EventBatch>), DebugError> {
        let mut stream = TcpStream::connect((host, port)).await?;

        stream.write_all(wire::HANDSHAKE).await?;
        let mut reply = [0u8; wire::HANDSHAKE.len()];
        stream.read_exact(&mut reply).await?;
        if &reply != wire::HANDSHAKE {
            return Err(DebugError::Handshake);
        }

        let (read_half, write_half) = stream.into_split();
        let pending: Arc<PendingMap> = Arc::default();
        let sizes = Arc::new(RwLock::new(IdSizes::default()));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(read_loop(
            read_half,
            Arc::clone(&pending),
            Arc::clone(&sizes),
            event_tx,
        ));

        let client = Self {
            writer: tokio::sync::Mutex::new(write_half),
            pending,
            next_id: AtomicU32::new(1),
            sizes,
        };
        Ok((client, event_rx))
    }

    fn sizes(&self) -> IdSizes {
        self.sizes.read().map(|guard| *guard).unwrap_or_default()
    }

    async fn command(&self, pair: (u8, u8), payload: &[u8]) -> Result<Vec<u8>, DebugError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id, tx);
        }

        let framed = wire::frame_command(id, pair, payload);
        {
            let mut writer = self.writer.lock().await;
            writer.write_all(&framed).await?;
        }

        rx.await.map_err(|_| DebugError::Disconnected)?
    }

    /// Query identifier widths; must run first so every later payload
    /// is decoded at the right widths.
    pub async fn fetch_id_sizes(&self) -> Result<IdSizes, DebugError> {
        let reply = self.command(command::VM_ID_SIZES, &[]).await?;
        let mut reader = PayloadReader::new(&reply);
        let narrow = |v: u32| u8::try_from(v).unwrap_or(8);
        let sizes = IdSizes {
            field: narrow(reader.u32()?),
            method: narrow(reader.u32()?),
            object: narrow(reader.u32()?),
            reference_type: narrow(reader.u32()?),
            frame: narrow(reader.u32()?),
        };
        if let Ok(mut guard) = self.sizes.write() {
            *guard = sizes;
        }
        Ok(sizes)
    }

    /// Reference types matching a JNI signature such as `LDemo;`.
    pub async fn classes_by_name(&self, signature: &str) -> Result<Vec<u64>, DebugError> {
        let mut writer = PayloadWriter::new();
        writer.string(signature);
        let reply = self
            .command(command::VM_CLASSES_BY_NAME, &writer.finish())
            .await?;

        let sizes = self.sizes();
        let mut reader = PayloadReader::new(&reply);
        let count = reader.u32()?;
        let mut classes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let _type_tag = reader.u8()?;
            let type_id = reader.id(sizes.reference_type)?;
            let _status = reader.u32()?;
            classes.push(type_id);
        }
        Ok(classes)
    }

    pub async fn methods(&self, class_id: u64) -> Result<Vec<MethodInfo>, DebugError> {
        let sizes = self.sizes();
        let mut writer = PayloadWriter::new();
        writer.id(class_id, sizes.reference_type);
        let reply = self
            .command(command::REFERENCE_TYPE_METHODS, &writer.finish())
            .await?;

        let mut reader = PayloadReader::new(&reply);
        let count = reader.u32()?;
        let mut methods = Vec::with_capacity(count as usize);
        for _ in 0..count {
            methods.push(MethodInfo {
                id: reader.id(sizes.method)?,
                name: reader.string()?,
                signature: reader.string()?,
                mod_bits: reader.u32()?,
            });
        }
        Ok(methods)
    }

    /// Line table of one method: (bytecode index, source line) pairs.
    /// Native and abstract methods report an error; callers treat
    /// that as "no locations" rather than a failure.
    pub async fn line_table(
        &self,
        class_id: u64,
        method_id: u64,
    ) -> Result<Vec<(u64, u32)>, DebugError> {
        let sizes = self.sizes();
        let mut writer = PayloadWriter::new();
        writer
            .id(class_id, sizes.reference_type)
            .id(method_id, sizes.method);
        let reply = self
            .command(command::METHOD_LINE_TABLE, &writer.finish())
            .await?;

        let mut reader = PayloadReader::new(&reply);
        let _start = reader.i64()?;
        let _end = reader.i64()?;
        let count = reader.u32()?;
        let mut lines = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let index = reader.u64()?;
            let line = reader.u32()?;
            lines.push((index, line));
        }
        Ok(lines)
    }

    /// Install an event request; returns the request id for clearing.
    pub async fn set_event_request(
        &self,
        kind: u8,
        suspend: u8,
        modifiers: &[Modifier],
    ) -> Result<u32, DebugError> {
        let sizes = self.sizes();
        let mut writer = PayloadWriter::new();
        writer
            .u8(kind)
            .u8(suspend)
            .u32(u32::try_from(modifiers.len()).unwrap_or(u32::MAX));
        for modifier in modifiers {
            modifier.encode(&mut writer, sizes);
        }
        let reply = self
            .command(command::EVENT_REQUEST_SET, &writer.finish())
            .await?;
        PayloadReader::new(&reply).u32()
    }

    pub async fn clear_event_request(&self, kind: u8, request_id: u32) -> Result<(), DebugError> {
        let mut writer = PayloadWriter::new();
        writer.u8(kind).u32(request_id);
        self.command(command::EVENT_REQUEST_CLEAR, &writer.finish())
            .await?;
        Ok(())
    }

    pub async fn set_breakpoint(&self, location: Location) -> Result<u32, DebugError> {
        self.set_event_request(
            wire::event_kind::BREAKPOINT,
            wire::suspend_policy::ALL,
            &[Modifier::LocationOnly(location)],
        )
        .await
    }

    pub async fn resume(&self) -> Result<(), DebugError> {
        self.command(command::VM_RESUME, &[]).await?;
        Ok(())
    }

    /// Tell the VM we are done. The VM resumes and the connection
    /// closes; safe to call on an already-dead connection.
    pub async fn dispose(&self) -> Result<(), DebugError> {
        self.command(command::VM_DISPOSE, &[]).await?;
        Ok(())
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    pending: Arc<PendingMap>,
    sizes: Arc<RwLock<IdSizes>>,
    events: mpsc::UnboundedSender<EventBatch>,
) {
    loop {
        let mut header_bytes = [0u8; wire::HEADER_LEN];
        if reader.read_exact(&mut header_bytes).await.is_err() {
            break;
        }
        let header = PacketHeader::parse(&header_bytes);
        let body_len = (header.length as usize).saturating_sub(wire::HEADER_LEN);
        let mut body = vec![0u8; body_len];
        if reader.read_exact(&mut body).await.is_err() {
            break;
        }

        if header.is_reply() {
            let waiter = pending.lock().ok().and_then(|mut map| map.remove(&header.id));
            if let Some(tx) = waiter {
                let result = if header.code == 0 {
                    Ok(body)
                } else {
                    Err(DebugError::Command(header.code))
                };
                let _ = tx.send(result);
            }
            continue;
        }

        let pair = ((header.code >> 8) as u8, (header.code & 0xff) as u8);
        if pair == command::EVENT_COMPOSITE {
            let current = sizes.read().map(|guard| *guard).unwrap_or_default();
            match wire::parse_composite(&body, current) {
                Ok(batch) => {
                    if events.send(batch).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "dropping malformed composite event");
                }
            }
        } else {
            tracing::trace!(set = pair.0, cmd = pair.1, "ignoring unexpected command packet");
        }
    }

    // Connection gone: fail every caller still waiting on a reply.
    if let Ok(mut map) = pending.lock() {
        for (_, tx) in map.drain() {
            let _ = tx.send(Err(DebugError::Disconnected));
        }
    }
}
