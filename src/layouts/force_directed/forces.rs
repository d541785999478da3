use egui::{Pos2, Vec2};

use super::Body;
use crate::Graph;

const GOLDEN_ANGLE: f32 = 2.399_963;

/// Unit vector pointing from `b` to `a`. Coincident points get a direction derived from the
/// pair so that they still separate, and the same pair always separates the same way.
pub(crate) fn separation_dir(a: Pos2, b: Pos2, i: usize, j: usize) -> Vec2 {
    let delta = a - b;
    let len = delta.length();
    if len > f32::EPSILON && len.is_finite() {
        return delta / len;
    }
    Vec2::angled((i as f32 + 1.0) * GOLDEN_ANGLE + j as f32)
}

pub(crate) fn compute_repulsion(bodies: &[Body], forces: &mut [Vec2], charge: f32, min_distance: f32) {
    if charge == 0.0 {
        return;
    }
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let (a, b) = (bodies[i].pos, bodies[j].pos);
            let distance = (a - b).length().max(min_distance);
            let dir = separation_dir(a, b, i, j);
            let f = dir * (charge / distance);
            forces[i] += f;
            forces[j] -= f;
        }
    }
}

pub(crate) fn compute_links(
    g: &Graph,
    bodies: &[Body],
    forces: &mut [Vec2],
    rest: f32,
    strength: f32,
    min_distance: f32,
) {
    if strength == 0.0 {
        return;
    }
    for (_, link) in g.links() {
        if link.is_loop() {
            continue;
        }
        let (s, t) = (link.source().index(), link.target().index());
        let (Some(src), Some(dst)) = (bodies.get(s), bodies.get(t)) else {
            continue;
        };
        let distance = (dst.pos - src.pos).length().max(min_distance);
        let dir = separation_dir(dst.pos, src.pos, s, t);
        let f = dir * (strength * (distance - rest));
        forces[s] += f;
        forces[t] -= f;
    }
}

pub(crate) fn compute_centering(bodies: &[Body], forces: &mut [Vec2], center: Pos2, strength: f32) {
    if strength == 0.0 {
        return;
    }
    for (f, body) in forces.iter_mut().zip(bodies) {
        *f += (center - body.pos) * strength;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{RawLink, RawNode};

    fn bodies(points: &[(f32, f32)]) -> Vec<Body> {
        points
            .iter()
            .map(|&(x, y)| Body::at(Pos2::new(x, y)))
            .collect()
    }

    #[test]
    fn repulsion_pushes_apart() {
        let b = bodies(&[(0.0, 0.0), (10.0, 0.0)]);
        let mut f = vec![Vec2::ZERO; 2];
        compute_repulsion(&b, &mut f, 100.0, 1.0);
        assert!(f[0].x < 0.0);
        assert!(f[1].x > 0.0);
        assert_eq!(f[0], -f[1]);
    }

    #[test]
    fn repulsion_of_coincident_nodes_is_finite_and_nonzero() {
        let b = bodies(&[(5.0, 5.0), (5.0, 5.0)]);
        let mut f = vec![Vec2::ZERO; 2];
        compute_repulsion(&b, &mut f, 100.0, 1.0);
        assert!(f[0].x.is_finite() && f[0].y.is_finite());
        assert!(f[0].length() > 0.0);
        assert!((f[0].length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn link_pulls_when_stretched_and_pushes_when_compressed() {
        let g = Graph::build(
            vec![RawNode::new("a"), RawNode::new("b")],
            vec![RawLink::new("a", "b")],
        )
        .unwrap();

        let far = bodies(&[(0.0, 0.0), (500.0, 0.0)]);
        let mut f = vec![Vec2::ZERO; 2];
        compute_links(&g, &far, &mut f, 100.0, 0.1, 1.0);
        assert!(f[0].x > 0.0, "source pulled towards target");
        assert!(f[1].x < 0.0, "target pulled towards source");

        let near = bodies(&[(0.0, 0.0), (20.0, 0.0)]);
        let mut f = vec![Vec2::ZERO; 2];
        compute_links(&g, &near, &mut f, 100.0, 0.1, 1.0);
        assert!(f[0].x < 0.0);
        assert!(f[1].x > 0.0);
    }

    #[test]
    fn centering_points_to_center() {
        let b = bodies(&[(100.0, -50.0)]);
        let mut f = vec![Vec2::ZERO; 1];
        compute_centering(&b, &mut f, Pos2::ZERO, 0.5);
        assert_eq!(f[0], Vec2::new(-50.0, 25.0));
    }
}
