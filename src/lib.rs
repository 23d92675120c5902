//! 🎥 Live video frame streaming over WebSocket.
//!
//! Pipeline: planar YUV frame → RGB raster → JPEG → one binary message on a
//! persistent `ws://host:port/name` connection. Single producer, single
//! consumer, one frame in flight: frames are silently dropped whenever no
//! session is open, and nothing is buffered, retried, or acknowledged.

pub mod capture;
pub mod cli;
pub mod config;
pub mod controller;
pub mod convert;
pub mod encode;
pub mod frame;
pub mod server;
pub mod transport;
