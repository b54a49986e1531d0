use glam::{Quat, Vec3};
use rand::Rng;

/// A light source handed to the scene at construction.
///
/// The kind tag is what classification partitions on; the scene never probes
/// concrete types at runtime.
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

#[derive(Clone, Copy, Debug)]
pub struct DirectionalLight {
    pub direction: Vec3,
}

#[derive(Clone, Copy, Debug)]
pub struct PointLight {
    pub position: Vec3,
}

/// The only light kind that receives shadow maps.
#[derive(Clone, Copy, Debug)]
pub struct SpotLight {
    pub position: Vec3,
    pub direction: Vec3,
    /// Full cone angle in degrees.
    pub angle_deg: f32,
}

impl SpotLight {
    pub fn new(position: Vec3, direction: Vec3, angle_deg: f32) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            angle_deg,
        }
    }

    /// Rotate the light's direction around the world +Y axis by `delta_rad`.
    pub fn rotate(&mut self, delta_rad: f32) {
        self.direction = (Quat::from_axis_angle(Vec3::Y, delta_rad) * self.direction).normalize();
    }
}

/// Lights partitioned by kind. Order within each list is the construction
/// order of the input, and the spotlight order doubles as the shadow-slot
/// index.
#[derive(Default)]
pub struct ClassifiedLights {
    pub directional: Vec<DirectionalLight>,
    pub point: Vec<PointLight>,
    pub spot: Vec<SpotLight>,
}

impl ClassifiedLights {
    pub fn classify(lights: Vec<Light>) -> Self {
        let mut classified = Self::default();

        for light in lights {
            match light {
                Light::Directional(l) => classified.directional.push(l),
                Light::Point(l) => classified.point.push(l),
                Light::Spot(l) => classified.spot.push(l),
            }
        }

        classified
    }
}

/// Which spotlights receive shadow maps.
///
/// Policy: every spotlight casts shadows, in construction order, up to the
/// configured maximum. Spotlights past the maximum silently receive none;
/// directional and point lights never do. No prioritization by brightness,
/// distance or visibility is performed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowPlan {
    shadowed_lights: usize,
}

impl ShadowPlan {
    pub fn new(num_spot_lights: usize, max_shadowed_lights: usize) -> Self {
        Self {
            shadowed_lights: num_spot_lights.min(max_shadowed_lights),
        }
    }

    /// Number of spotlights that get a pair of shadow passes.
    pub fn shadowed_lights(&self) -> usize {
        self.shadowed_lights
    }

    /// Number of render-target layers: one forward and one backward per
    /// shadowed light.
    pub fn target_count(&self) -> usize {
        2 * self.shadowed_lights
    }

    pub fn is_empty(&self) -> bool {
        self.shadowed_lights == 0
    }
}

/// Sample one fixed angular speed (radians per frame) for each shadowed
/// spotlight, uniformly from `[-range / 2, range / 2]`.
pub fn rotation_speeds<R: Rng>(count: usize, range: f32, rng: &mut R) -> Vec<f32> {
    (0..count)
        .map(|_| rng.gen::<f32>() * range - range / 2.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(x: f32) -> Light {
        Light::Spot(SpotLight::new(Vec3::new(x, 10.0, 0.0), Vec3::X, 30.0))
    }

    #[test]
    fn classification_partitions_by_kind_in_order() {
        let lights = vec![
            Light::Point(PointLight { position: Vec3::ZERO }),
            spot(1.0),
            Light::Directional(DirectionalLight { direction: Vec3::NEG_Y }),
            spot(2.0),
        ];

        let classified = ClassifiedLights::classify(lights);

        assert_eq!(1, classified.directional.len());
        assert_eq!(1, classified.point.len());
        assert_eq!(2, classified.spot.len());
        assert_eq!(1.0, classified.spot[0].position.x);
        assert_eq!(2.0, classified.spot[1].position.x);
    }

    #[test]
    fn plan_is_bounded_by_the_maximum() {
        assert_eq!(0, ShadowPlan::new(0, 3).shadowed_lights());
        assert_eq!(2, ShadowPlan::new(2, 3).shadowed_lights());
        assert_eq!(3, ShadowPlan::new(5, 3).shadowed_lights());

        assert!(ShadowPlan::new(0, 3).is_empty());
        assert!(!ShadowPlan::new(1, 3).is_empty());
    }

    #[test]
    fn plan_allocates_two_targets_per_light() {
        // Five spotlights with room for three: six target layers.
        let plan = ShadowPlan::new(5, 3);
        assert_eq!(6, plan.target_count());
        assert_eq!(0, ShadowPlan::new(0, 3).target_count());
    }

    #[test]
    fn rotation_speeds_stay_in_range() {
        let mut rng = rand::thread_rng();
        let range = 0.05;
        let speeds = rotation_speeds(3, range, &mut rng);

        assert_eq!(3, speeds.len());
        for s in speeds {
            assert!(s >= -range / 2.0 && s <= range / 2.0);
        }
    }

    #[test]
    fn rotate_round_trip_restores_direction() {
        let mut light = SpotLight::new(Vec3::ZERO, Vec3::new(1.0, -0.5, 0.25), 30.0);
        let original = light.direction;

        light.rotate(0.37);
        assert!((light.direction - original).length() > 1e-3);

        light.rotate(-0.37);
        assert!((light.direction - original).length() < 1e-5);
    }

    #[test]
    fn rotate_preserves_unit_length() {
        let mut light = SpotLight::new(Vec3::ZERO, Vec3::new(3.0, 1.0, -2.0), 45.0);

        for _ in 0..100 {
            light.rotate(0.1);
        }
        assert!((light.direction.length() - 1.0).abs() < 1e-4);
    }
}
