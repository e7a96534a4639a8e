//! Per-frame inputs to animation expressions.

/// Read-only view of the entity being rendered.
///
/// Implemented by the host for its entity type; expressions reach it only
/// through entity functions such as `health(entity)`.
pub trait EntityState {
    fn health(&self) -> f32;
    fn max_health(&self) -> f32;
    /// Remaining hurt animation ticks
    fn hurt_time(&self) -> f32;
    fn is_child(&self) -> bool;
    fn is_in_water(&self) -> bool;
    fn is_riding(&self) -> bool;
    fn is_sneaking(&self) -> bool;
}

/// Entity properties an expression can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityProperty {
    Health,
    MaxHealth,
    HurtTime,
    IsChild,
    IsInWater,
    IsRiding,
    IsSneaking,
}

impl EntityProperty {
    /// Function name used in expressions.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "health" => Self::Health,
            "max_health" => Self::MaxHealth,
            "hurt_time" => Self::HurtTime,
            "is_child" => Self::IsChild,
            "is_in_water" => Self::IsInWater,
            "is_riding" => Self::IsRiding,
            "is_sneaking" => Self::IsSneaking,
            _ => return None,
        })
    }

    /// Read the property; flags become `1.0` or `0.0`.
    pub fn read(self, entity: &dyn EntityState) -> f32 {
        let flag = |set: bool| if set { 1.0 } else { 0.0 };
        match self {
            Self::Health => entity.health(),
            Self::MaxHealth => entity.max_health(),
            Self::HurtTime => entity.hurt_time(),
            Self::IsChild => flag(entity.is_child()),
            Self::IsInWater => flag(entity.is_in_water()),
            Self::IsRiding => flag(entity.is_riding()),
            Self::IsSneaking => flag(entity.is_sneaking()),
        }
    }
}

/// Pose variables bound by name in expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseVariable {
    LimbSwing,
    LimbSpeed,
    Age,
    HeadYaw,
    HeadPitch,
}

impl PoseVariable {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "limb_swing" => Self::LimbSwing,
            "limb_speed" => Self::LimbSpeed,
            "age" => Self::Age,
            "head_yaw" => Self::HeadYaw,
            "head_pitch" => Self::HeadPitch,
            _ => return None,
        })
    }
}

/// Inputs for one animation frame.
#[derive(Clone, Copy, Default)]
pub struct PoseInputs<'a> {
    /// Limb swing angle
    pub limb_swing: f32,
    /// Limb swing distance
    pub limb_speed: f32,
    /// Age in ticks
    pub age: f32,
    pub head_yaw: f32,
    pub head_pitch: f32,
    pub entity: Option<&'a dyn EntityState>,
}

impl<'a> PoseInputs<'a> {
    pub fn new(limb_swing: f32, limb_speed: f32, age: f32, head_yaw: f32, head_pitch: f32) -> Self {
        Self { limb_swing, limb_speed, age, head_yaw, head_pitch, entity: None }
    }

    pub fn with_entity(mut self, entity: &'a dyn EntityState) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn variable(&self, variable: PoseVariable) -> f32 {
        match variable {
            PoseVariable::LimbSwing => self.limb_swing,
            PoseVariable::LimbSpeed => self.limb_speed,
            PoseVariable::Age => self.age,
            PoseVariable::HeadYaw => self.head_yaw,
            PoseVariable::HeadPitch => self.head_pitch,
        }
    }

    /// Entity property, or `0.0` when no entity is bound.
    pub fn entity_property(&self, property: EntityProperty) -> f32 {
        self.entity.map_or(0.0, |entity| property.read(entity))
    }
}

impl std::fmt::Debug for PoseInputs<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseInputs")
            .field("limb_swing", &self.limb_swing)
            .field("limb_speed", &self.limb_speed)
            .field("age", &self.age)
            .field("head_yaw", &self.head_yaw)
            .field("head_pitch", &self.head_pitch)
            .field("entity", &self.entity.is_some())
            .finish()
    }
}
