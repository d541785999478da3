mod event;

pub use event::{
    Event, PayloadLayoutSettled, PayloadNodeClick, PayloadNodeDeselect, PayloadNodeDragEnd,
    PayloadNodeDragStart, PayloadNodeMove, PayloadNodeSelect, PayloadPan, PayloadZoom,
};
