//! Device session over simpleRPC
//!
//! [`RpcSession`] maps each [`DeviceSession`] primitive onto the procedure
//! of the same meaning exported by the dumper firmware.

use std::time::Duration;

use sinodump_core::error::{Error as CoreError, Result as CoreResult};
use sinodump_core::method::{ReadMethod, TransferMethod};
use sinodump_core::session::{DeviceSession, BLOCK_SIZE, SENTINEL_BYTE};

use crate::client::RpcClient;
use crate::protocol::Value;
use crate::transport::Transport;

/// Procedures the session relies on
pub const REQUIRED_METHODS: &[&str] = &[
    "connect",
    "disconnect",
    "checkICP",
    "checkJTAG",
    "getID",
    "pingICP",
    "readByteICP",
    "readByteJTAG",
    "read16ICP",
    "read16JTAG",
    "getBufferByte",
    "detectReadMethod",
    "getProductBlockAddress",
    "getCodeOptionsAddress",
    "getCodeOptionsSize",
    "getCodeOptionsInFlash",
    "getChipType",
    "getFlashSize",
    "getProductBlock",
    "getCustomBlock",
];

/// Timeout for the target handshake (waits for the power cycle)
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

fn read_byte_method(method: TransferMethod) -> &'static str {
    match method {
        TransferMethod::Icp => "readByteICP",
        TransferMethod::Jtag => "readByteJTAG",
    }
}

fn read16_method(method: TransferMethod) -> &'static str {
    match method {
        TransferMethod::Icp => "read16ICP",
        TransferMethod::Jtag => "read16JTAG",
    }
}

/// Dumper session over a simpleRPC client
pub struct RpcSession<T: Transport> {
    client: RpcClient<T>,
    connected: bool,
    connect_timeout: Duration,
}

impl<T: Transport> RpcSession<T> {
    /// Wrap an opened client
    ///
    /// Procedures missing from the firmware are reported here; calling one
    /// later fails with [`CoreError::UnsupportedPrimitive`].
    pub fn new(client: RpcClient<T>) -> Self {
        for name in REQUIRED_METHODS {
            if client.method(name).is_none() {
                log::warn!("Firmware does not provide '{}'", name);
            }
        }
        Self {
            client,
            connected: true,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    /// Set the timeout used for the target handshake
    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    /// Enable or disable call tracing
    pub fn set_trace(&mut self, trace: bool) {
        self.client.set_trace(trace);
    }

    /// Access the underlying client
    pub fn client(&mut self) -> &mut RpcClient<T> {
        &mut self.client
    }

    /// Give back the client
    pub fn into_inner(self) -> RpcClient<T> {
        self.client
    }

    fn query_bool(&mut self, name: &str, args: &[Value]) -> CoreResult<bool> {
        if !self.connected {
            return Ok(false);
        }
        Ok(self.client.call_bool(name, args)?)
    }

    /// Query an unsigned value, `0` without a connection
    fn query<N: TryFrom<u64> + Default>(&mut self, name: &str, args: &[Value]) -> CoreResult<N> {
        if !self.connected {
            return Ok(N::default());
        }
        let value = self.client.call_uint(name, args)?;
        N::try_from(value).map_err(|_| {
            log::debug!("rpc: {} returned out-of-range value {}", name, value);
            CoreError::ProtocolError
        })
    }
}

impl<T: Transport> DeviceSession for RpcSession<T> {
    fn connect(&mut self) -> CoreResult<bool> {
        let timeout = self.connect_timeout;
        let ok = self
            .client
            .with_timeout(timeout, |c| c.call_bool("connect", &[]))?;
        self.connected = ok;
        Ok(ok)
    }

    fn disconnect(&mut self) -> CoreResult<()> {
        // the firmware releases the target lines even after a failed handshake
        self.connected = false;
        Ok(self.client.call_void("disconnect", &[])?)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn check_icp(&mut self) -> CoreResult<bool> {
        self.query_bool("checkICP", &[])
    }

    fn check_jtag(&mut self) -> CoreResult<bool> {
        self.query_bool("checkJTAG", &[])
    }

    fn ping_icp(&mut self) -> CoreResult<()> {
        if !self.connected {
            return Ok(());
        }
        Ok(self.client.call_void("pingICP", &[])?)
    }

    fn id(&mut self) -> CoreResult<u16> {
        self.query("getID", &[])
    }

    fn detect_read_method(&mut self) -> CoreResult<ReadMethod> {
        if !self.connected {
            return Ok(ReadMethod::Failed);
        }
        let code: u8 = self.query("detectReadMethod", &[])?;
        match ReadMethod::try_from(code)? {
            ReadMethod::Auto => Err(CoreError::InvalidMethodCode(code)),
            method => Ok(method),
        }
    }

    fn chip_type(&mut self) -> CoreResult<u8> {
        self.query("getChipType", &[])
    }

    fn flash_size(&mut self) -> CoreResult<u32> {
        self.query("getFlashSize", &[])
    }

    fn product_block(&mut self) -> CoreResult<bool> {
        self.query_bool("getProductBlock", &[])
    }

    fn custom_block(&mut self) -> CoreResult<u8> {
        self.query("getCustomBlock", &[])
    }

    fn product_block_address(&mut self) -> CoreResult<u32> {
        self.query("getProductBlockAddress", &[])
    }

    fn code_options_address(&mut self) -> CoreResult<u32> {
        self.query("getCodeOptionsAddress", &[])
    }

    fn code_options_size(&mut self) -> CoreResult<u32> {
        self.query("getCodeOptionsSize", &[])
    }

    fn code_options_in_flash(&mut self) -> CoreResult<bool> {
        self.query_bool("getCodeOptionsInFlash", &[])
    }

    fn read_byte(&mut self, method: TransferMethod, address: u32, custom_block: bool) -> CoreResult<u8> {
        if !self.connected {
            return Ok(SENTINEL_BYTE);
        }
        self.query(read_byte_method(method), &[address.into(), custom_block.into()])
    }

    fn read_block(&mut self, method: TransferMethod, address: u32, custom_block: bool) -> CoreResult<bool> {
        self.query_bool(read16_method(method), &[address.into(), custom_block.into()])
    }

    fn buffer_byte(&mut self, index: usize) -> CoreResult<u8> {
        if !self.connected || index >= BLOCK_SIZE {
            return Ok(SENTINEL_BYTE);
        }
        self.query("getBufferByte", &[(index as u8).into()])
    }
}
