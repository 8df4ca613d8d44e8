//! simpleRPC client
//!
//! [`RpcClient`] fetches the interface listing once when it is opened and
//! then calls methods by name, packing arguments according to the
//! signatures the device announced.

use std::thread::sleep;
use std::time::Duration;

use crate::error::{Result, RpcError};
use crate::protocol::*;
use crate::transport::Transport;

/// A simpleRPC connection with a known method table
pub struct RpcClient<T: Transport> {
    /// Transport layer (serial or TCP)
    transport: T,
    /// Hardware description from the listing
    hardware: HardwareInfo,
    /// Methods in index order
    methods: Vec<MethodSignature>,
    /// Log every call and its reply
    trace: bool,
}

impl<T: Transport> RpcClient<T> {
    /// Create a new client on an open transport
    ///
    /// This performs initialization:
    /// 1. Wait `settle` for the device to come out of reset
    /// 2. Drain anything it printed while booting
    /// 3. Fetch and parse the interface listing
    pub fn open(transport: T, settle: Duration) -> Result<Self> {
        let mut client = Self {
            transport,
            hardware: HardwareInfo {
                endianness: Endianness::Little,
                size_t: TypeCode::U16,
            },
            methods: Vec::new(),
            trace: false,
        };

        if !settle.is_zero() {
            log::debug!("rpc: Waiting {:?} for the device to settle", settle);
            sleep(settle);
        }
        client.drain()?;
        client.fetch_interface()?;

        log::debug!(
            "rpc: Interface has {} methods ({:?} endian)",
            client.methods.len(),
            client.hardware.endianness
        );

        Ok(client)
    }

    /// Enable or disable call tracing
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    /// Hardware description of the device
    pub fn hardware(&self) -> &HardwareInfo {
        &self.hardware
    }

    /// Methods exported by the device
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Mutable access to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give back the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Run `f` with a different reply timeout
    pub fn with_timeout<R, F: FnOnce(&mut Self) -> Result<R>>(
        &mut self,
        timeout: Duration,
        f: F,
    ) -> Result<R> {
        let old_timeout = self.transport.timeout();
        self.transport.set_timeout(timeout)?;
        let result = f(self);
        self.transport.set_timeout(old_timeout)?;
        result
    }

    /// Call a method by name
    ///
    /// Returns the decoded return value, or `None` for `void` methods.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        let method = self
            .method(name)
            .ok_or_else(|| RpcError::UnknownMethod(name.to_string()))?;

        if method.params.len() != args.len() {
            return Err(RpcError::ArgumentCount {
                method: name.to_string(),
                expected: method.params.len(),
                given: args.len(),
            });
        }

        let mut request = vec![method.index];
        for (&code, &arg) in method.params.iter().zip(args) {
            arg.encode(code, self.hardware.endianness, &mut request)?;
        }
        let returns = method.returns;

        self.transport.write(&request)?;
        self.transport.flush()?;

        let value = match returns {
            Some(code) => {
                let mut buf = [0u8; 8];
                self.transport.read(&mut buf[..code.size()])?;
                Some(Value::decode(code, &buf, self.hardware.endianness))
            }
            None => None,
        };

        if self.trace {
            log::info!("[RPC] {}({:?}) -> {:?}", name, args, value);
        }

        Ok(value)
    }

    /// Call a method returning a boolean
    pub fn call_bool(&mut self, name: &str, args: &[Value]) -> Result<bool> {
        self.call(name, args)?
            .map(Value::as_bool)
            .ok_or_else(|| RpcError::UnexpectedReturn(name.to_string()))
    }

    /// Call a method returning an unsigned integer
    pub fn call_uint(&mut self, name: &str, args: &[Value]) -> Result<u64> {
        self.call(name, args)?
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::UnexpectedReturn(name.to_string()))
    }

    /// Call a method and ignore its return value
    pub fn call_void(&mut self, name: &str, args: &[Value]) -> Result<()> {
        self.call(name, args).map(|_| ())
    }

    // ---- Protocol implementation ----

    /// Discard pending input (boot banner, stale replies)
    fn drain(&mut self) -> Result<()> {
        let mut buf = [0u8; 512];
        let mut drained = 0;
        for _ in 0..1024 {
            let n = self.transport.read_nonblock(&mut buf, 10)?;
            if n == 0 {
                break;
            }
            drained += n;
        }
        if drained > 0 {
            log::debug!("rpc: Discarded {} bytes of pending input", drained);
        }
        Ok(())
    }

    /// Read a NUL-terminated string
    fn read_cstring(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut c = [0u8];
        loop {
            self.transport.read(&mut c)?;
            if c[0] == 0 {
                return Ok(out);
            }
            if out.len() >= MAX_STRING_LEN {
                return Err(RpcError::StringTooLong);
            }
            out.push(c[0]);
        }
    }

    /// Request and parse the interface listing
    fn fetch_interface(&mut self) -> Result<()> {
        self.transport.write(&[LIST_REQUEST])?;
        self.transport.flush()?;

        if self.read_cstring()? != PROTOCOL_NAME {
            return Err(RpcError::MissingHeader);
        }

        let mut version = [0u8; 3];
        self.transport.read(&mut version)?;
        if version[0] != PROTOCOL_VERSION.0 {
            return Err(RpcError::UnsupportedVersion(version[0], version[1], version[2]));
        }

        self.hardware = HardwareInfo::parse(&self.read_cstring()?)?;

        self.methods.clear();
        for index in 0..=u8::MAX {
            let line = self.read_cstring()?;
            if line.is_empty() {
                return Ok(());
            }
            match MethodSignature::parse(index, &line) {
                Ok(method) => self.methods.push(method),
                Err(e) => log::warn!("rpc: Skipping method {}: {}", index, e),
            }
        }

        // 256 methods and no terminator
        Err(RpcError::MalformedSignature("unterminated method list".into()))
    }
}
