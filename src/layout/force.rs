//! Velocity-Verlet force simulation over circular bodies.
//!
//! Each tick cools `alpha` toward zero, lets every enabled force add to the
//! body velocities, then damps the velocities and moves the bodies. Forces
//! that scale with `alpha` fade out as the system cools; collision does not,
//! so overlapping bodies keep separating until the last tick.

use rand::Rng;
use rand::rngs::StdRng;

/// Squared distance below which repulsion stops growing.
const MIN_DISTANCE_SQ: f64 = 1.0;
/// Number of ticks over which alpha decays from 1 to `alpha_min`.
const COOLING_TICKS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
}

impl Body {
    pub fn at(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            radius,
        }
    }
}

/// Spring between two bodies pulling them toward `distance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub distance: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collide {
    pub strength: f64,
    pub iterations: usize,
}

/// Pull toward a fixed point, applied to velocities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub strength: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forces {
    /// Pairwise charge; negative values repel.
    pub charge: Option<f64>,
    pub collide: Option<Collide>,
    /// Shifts the centroid toward the anchor point by `strength` each tick.
    pub center: Option<Anchor>,
    /// Per-body pull toward the anchor point on each axis.
    pub position: Option<Anchor>,
}

pub struct Simulation<'r> {
    bodies: Vec<Body>,
    links: Vec<Link>,
    forces: Forces,
    alpha: f64,
    alpha_decay: f64,
    velocity_decay: f64,
    rng: &'r mut StdRng,
}

impl<'r> Simulation<'r> {
    pub fn new(bodies: Vec<Body>, rng: &'r mut StdRng) -> Self {
        Self {
            bodies,
            links: Vec::new(),
            forces: Forces::default(),
            alpha: 1.0,
            alpha_decay: cooling_rate(0.001),
            velocity_decay: 0.4,
            rng,
        }
    }

    pub fn links(mut self, links: Vec<Link>) -> Self {
        let n = self.bodies.len();
        self.links = links
            .into_iter()
            .filter(|l| l.source != l.target && l.source < n && l.target < n)
            .collect();
        self
    }

    pub fn forces(mut self, forces: Forces) -> Self {
        self.forces = forces;
        self
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Alpha reached after the cooling period; sets the decay rate.
    pub fn alpha_min(mut self, alpha_min: f64) -> Self {
        self.alpha_decay = cooling_rate(alpha_min);
        self
    }

    pub fn velocity_decay(mut self, decay: f64) -> Self {
        self.velocity_decay = decay;
        self
    }

    pub fn run(mut self, ticks: usize) -> Vec<Body> {
        if self.bodies.len() > 1 {
            for _ in 0..ticks {
                self.tick();
            }
        }
        self.bodies
    }

    pub fn tick(&mut self) {
        self.alpha += -self.alpha * self.alpha_decay;

        if let Some(charge) = self.forces.charge {
            self.apply_charge(charge);
        }
        if !self.links.is_empty() {
            self.apply_links();
        }
        if let Some(collide) = self.forces.collide {
            for _ in 0..collide.iterations {
                self.apply_collide(collide.strength);
            }
        }
        if let Some(anchor) = self.forces.position {
            self.apply_position(anchor);
        }

        let keep = 1.0 - self.velocity_decay;
        for b in &mut self.bodies {
            b.vx *= keep;
            b.vy *= keep;
            b.x += b.vx;
            b.y += b.vy;
        }

        if let Some(anchor) = self.forces.center {
            self.apply_center(anchor);
        }
    }

    /// Tiny random offset that breaks exact coincidence.
    fn jiggle(&mut self) -> f64 {
        (self.rng.random::<f64>() - 0.5) * 1e-6
    }

    fn apply_charge(&mut self, strength: f64) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let mut dx = self.bodies[j].x - self.bodies[i].x;
                let mut dy = self.bodies[j].y - self.bodies[i].y;
                if dx == 0.0 {
                    dx = self.jiggle();
                }
                if dy == 0.0 {
                    dy = self.jiggle();
                }
                let mut l = dx * dx + dy * dy;
                if l < MIN_DISTANCE_SQ {
                    l = (MIN_DISTANCE_SQ * l).sqrt();
                }
                let w = strength * self.alpha / l;
                self.bodies[i].vx += dx * w;
                self.bodies[i].vy += dy * w;
            }
        }
    }

    fn apply_links(&mut self) {
        let mut degree = vec![0usize; self.bodies.len()];
        for l in &self.links {
            degree[l.source] += 1;
            degree[l.target] += 1;
        }

        for k in 0..self.links.len() {
            let link = self.links[k];
            let (s, t) = (self.bodies[link.source], self.bodies[link.target]);
            let mut x = t.x + t.vx - s.x - s.vx;
            let mut y = t.y + t.vy - s.y - s.vy;
            if x == 0.0 {
                x = self.jiggle();
            }
            if y == 0.0 {
                y = self.jiggle();
            }
            let len = (x * x + y * y).sqrt();
            let l = (len - link.distance) / len * self.alpha * link.strength;
            x *= l;
            y *= l;

            let bias =
                degree[link.source] as f64 / (degree[link.source] + degree[link.target]) as f64;
            self.bodies[link.target].vx -= x * bias;
            self.bodies[link.target].vy -= y * bias;
            self.bodies[link.source].vx += x * (1.0 - bias);
            self.bodies[link.source].vy += y * (1.0 - bias);
        }
    }

    fn apply_collide(&mut self, strength: f64) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (self.bodies[i], self.bodies[j]);
                let r = a.radius + b.radius;
                let mut x = a.x + a.vx - b.x - b.vx;
                let mut y = a.y + a.vy - b.y - b.vy;
                let mut l = x * x + y * y;
                if l >= r * r {
                    continue;
                }
                if x == 0.0 {
                    x = self.jiggle();
                    l += x * x;
                }
                if y == 0.0 {
                    y = self.jiggle();
                    l += y * y;
                }
                let len = l.sqrt();
                let push = (r - len) / len * strength;
                x *= push;
                y *= push;

                // The smaller body moves further.
                let ri2 = a.radius * a.radius;
                let rj2 = b.radius * b.radius;
                let share = if ri2 + rj2 > 0.0 { rj2 / (ri2 + rj2) } else { 0.5 };
                self.bodies[i].vx += x * share;
                self.bodies[i].vy += y * share;
                self.bodies[j].vx -= x * (1.0 - share);
                self.bodies[j].vy -= y * (1.0 - share);
            }
        }
    }

    fn apply_position(&mut self, anchor: Anchor) {
        let k = anchor.strength * self.alpha;
        for b in &mut self.bodies {
            b.vx += (anchor.x - b.x) * k;
            b.vy += (anchor.y - b.y) * k;
        }
    }

    fn apply_center(&mut self, anchor: Anchor) {
        let n = self.bodies.len() as f64;
        let (sx, sy) = self
            .bodies
            .iter()
            .fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
        let dx = (sx / n - anchor.x) * anchor.strength;
        let dy = (sy / n - anchor.y) * anchor.strength;
        for b in &mut self.bodies {
            b.x -= dx;
            b.y -= dy;
        }
    }
}

/// Uniform sample in `[-half, half]`. Degenerate spans give 0.
pub fn scatter(rng: &mut impl Rng, half: f64) -> f64 {
    if half.is_finite() && half > 0.0 {
        rng.random_range(-half..=half)
    } else {
        0.0
    }
}

fn cooling_rate(alpha_min: f64) -> f64 {
    1.0 - alpha_min.powf(1.0 / COOLING_TICKS)
}
