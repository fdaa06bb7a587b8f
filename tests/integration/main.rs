mod mock_sources;
mod pipeline;
