/// Element time windows and playback policies.
pub mod timing;
