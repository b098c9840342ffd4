pub mod codec;
pub mod frame;

pub use codec::CodecInfo;
pub use frame::AudioFrame;
