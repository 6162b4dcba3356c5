pub mod chart_service;
pub mod render_sink;

pub use chart_service::{ChartHandle, ChartService, ServiceEvent};
pub use render_sink::{ChannelSink, LogSink, RenderSink};
