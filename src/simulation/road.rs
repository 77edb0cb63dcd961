use super::{Point, Vec2};
use crate::config::Road;

/// One straight piece of an authored road polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadSegment {
    pub p1: Point,
    pub p2: Point,
    pub length: f32,
    pub half_width: f32,
    /// Index of the road this segment was cut from.
    pub road_index: usize,
}

impl RoadSegment {
    pub fn new(p1: Point, p2: Point, half_width: f32, road_index: usize) -> Self {
        Self {
            p1,
            p2,
            length: (p2 - p1).magnitude(),
            half_width,
            road_index,
        }
    }

    pub fn direction(&self) -> Vec2 {
        self.p2 - self.p1
    }

    pub fn heading(&self) -> f32 {
        let d = self.direction();
        d.y.atan2(d.x)
    }

    /// Linear interpolation between the endpoints.
    pub fn point_at(&self, t: f32) -> Point {
        self.p1 + self.direction() * t
    }

    pub fn is_degenerate(&self) -> bool {
        self.length <= f32::EPSILON
    }
}

/// Flattened, order-preserving segment list of a scenario's roads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadNetwork {
    segments: Vec<RoadSegment>,
    centroid: Option<Point>,
}

impl RoadNetwork {
    /// Walk every road's points and emit one segment per consecutive pair.
    /// Roads with fewer than two points contribute nothing.
    pub fn compile(roads: &[Road]) -> Self {
        let mut segments = Vec::new();

        for (road_index, road) in roads.iter().enumerate() {
            let half_width = road.width / 2.0;
            for pair in road.points.windows(2) {
                segments.push(RoadSegment::new(
                    pair[0].to_point(),
                    pair[1].to_point(),
                    half_width,
                    road_index,
                ));
            }
        }

        log::debug!("Compiled {} roads into {} segments", roads.len(), segments.len());

        Self {
            segments,
            centroid: road_centroid(roads),
        }
    }

    pub fn segments(&self) -> &[RoadSegment] {
        &self.segments
    }

    pub fn get(&self, index: usize) -> Option<&RoadSegment> {
        self.segments.get(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Mean of every authored road point, including points of roads too
    /// short to produce a segment.
    pub fn centroid(&self) -> Option<Point> {
        self.centroid
    }

    pub fn total_length(&self) -> f32 {
        self.segments.iter().map(|s| s.length).sum()
    }

    pub fn is_on_road(&self, point: &Point) -> bool {
        is_on_road(point, self)
    }
}

/// Distance from `point` to the closest point of `segment`, using the
/// projection parameter clamped to [0, 1].
pub fn distance_to_segment(point: &Point, segment: &RoadSegment) -> f32 {
    let d = segment.direction();
    let len_sq = d.magnitude_squared();

    if len_sq <= f32::EPSILON {
        return (point - segment.p1).magnitude();
    }

    let t = ((point - segment.p1).dot(&d) / len_sq).clamp(0.0, 1.0);
    let closest = segment.p1 + d * t;
    (point - closest).magnitude()
}

/// True when some segment lies within its road's half-width of `point`.
pub fn is_on_road(point: &Point, network: &RoadNetwork) -> bool {
    network
        .segments
        .iter()
        .any(|segment| distance_to_segment(point, segment) <= segment.half_width)
}

pub fn road_centroid(roads: &[Road]) -> Option<Point> {
    let mut sum = Vec2::zeros();
    let mut count = 0usize;

    for point in roads.iter().flat_map(|r| r.points.iter()) {
        sum += Vec2::new(point.x, point.y);
        count += 1;
    }

    if count == 0 {
        return None;
    }

    let mean = sum / count as f32;
    Some(Point::new(mean.x, mean.y))
}
