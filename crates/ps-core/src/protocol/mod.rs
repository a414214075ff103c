//! Protocol module containing the Device Discovery Protocol text codec.

pub mod ddp;

pub use ddp::{
    build_search_request, build_wake_request, parse_search_response, ParseError, SearchResponse,
    DDP_VERSION,
};
