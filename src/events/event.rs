use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadPan {
    pub diff: [f32; 2],
    pub new_pan: [f32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadZoom {
    pub diff: f32,
    pub new_zoom: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadNodeClick {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadNodeSelect {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadNodeDeselect {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadNodeDragStart {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadNodeMove {
    pub id: String,
    pub new_pos: [f32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadNodeDragEnd {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayloadLayoutSettled {
    pub ticks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    Pan(PayloadPan),
    Zoom(PayloadZoom),
    NodeClick(PayloadNodeClick),
    NodeSelect(PayloadNodeSelect),
    NodeDeselect(PayloadNodeDeselect),
    NodeDragStart(PayloadNodeDragStart),
    NodeMove(PayloadNodeMove),
    NodeDragEnd(PayloadNodeDragEnd),
    LayoutSettled(PayloadLayoutSettled),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_contract_pan() {
        let event = Event::Pan(PayloadPan {
            diff: [1.0, 2.0],
            new_pan: [3.0, 4.0],
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"Pan":{"diff":[1.0,2.0],"new_pan":[3.0,4.0]}}"#);

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_contract_zoom() {
        let event = Event::Zoom(PayloadZoom {
            diff: 0.5,
            new_zoom: 1.5,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"Zoom":{"diff":0.5,"new_zoom":1.5}}"#);

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_contract_node_move() {
        let event = Event::NodeMove(PayloadNodeMove {
            id: "loop-1".to_string(),
            new_pos: [50.0, 60.0],
        });
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"NodeMove":{"id":"loop-1","new_pos":[50.0,60.0]}}"#);

        let decoded: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
