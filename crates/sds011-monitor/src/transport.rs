//! Sensor connections.
//!
//! The sensor talks 9600 baud, 8 data bits, no parity, one stop bit, no flow
//! control. It is reached either through a local serial port or through a
//! TCP serial bridge that forwards the raw byte stream.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::error::{MonitorError, MonitorResult};

/// Fixed line speed of the sensor.
pub const SENSOR_BAUD_RATE: u32 = 9600;

/// A bidirectional byte stream to one sensor.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

/// Boxed connection returned by [`open`].
pub type BoxedStream = Box<dyn ByteStream>;

/// Open the connection described by `config`.
pub async fn open(config: &TransportConfig) -> MonitorResult<BoxedStream> {
    match config {
        TransportConfig::Serial(port) => Ok(Box::new(open_serial(port)?)),
        TransportConfig::Tcp(addr) => Ok(Box::new(open_tcp(addr).await?)),
    }
}

/// Open a serial port at the sensor's fixed line settings.
pub fn open_serial(port: &str) -> MonitorResult<tokio_serial::SerialStream> {
    debug!(port = %port, baud_rate = SENSOR_BAUD_RATE, "Opening serial port");

    let stream = tokio_serial::new(port, SENSOR_BAUD_RATE)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|source| MonitorError::Serial {
            port: port.to_string(),
            source,
        })?;

    info!(port = %port, "Serial port opened");
    Ok(stream)
}

/// Connect to a TCP serial bridge.
pub async fn open_tcp(addr: &str) -> MonitorResult<TcpStream> {
    debug!(addr = %addr, "Connecting to serial bridge");
    let stream = TcpStream::connect(addr).await?;
    // Command frames are tiny; send them immediately.
    stream.set_nodelay(true)?;
    info!(addr = %addr, "Connected to serial bridge");
    Ok(stream)
}
