use serde::{Deserialize, Serialize};

/// A platform feature gated by the permission set.
///
/// Feature names match the column names of the `permission` table and the
/// keys of the `permissions` claim.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Availability,
    StudyPlan,
    Questions,
    Essay,
    Performance,
    ActivityHistory,
    Plans,
    PlacementTest,
    UserExams,
    FavoriteVideos,
    Notifications,
    Profile,
    OnDemandActivities,
    VirtualTutor,
}

impl Feature {
    pub const ALL: [Feature; 14] = [
        Feature::Availability,
        Feature::StudyPlan,
        Feature::Questions,
        Feature::Essay,
        Feature::Performance,
        Feature::ActivityHistory,
        Feature::Plans,
        Feature::PlacementTest,
        Feature::UserExams,
        Feature::FavoriteVideos,
        Feature::Notifications,
        Feature::Profile,
        Feature::OnDemandActivities,
        Feature::VirtualTutor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Availability => "availability",
            Feature::StudyPlan => "study_plan",
            Feature::Questions => "questions",
            Feature::Essay => "essay",
            Feature::Performance => "performance",
            Feature::ActivityHistory => "activity_history",
            Feature::Plans => "plans",
            Feature::PlacementTest => "placement_test",
            Feature::UserExams => "user_exams",
            Feature::FavoriteVideos => "favorite_videos",
            Feature::Notifications => "notifications",
            Feature::Profile => "profile",
            Feature::OnDemandActivities => "on_demand_activities",
            Feature::VirtualTutor => "virtual_tutor",
        }
    }
}

impl core::fmt::Display for Feature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-shape capability record attached to the `permissions` claim.
///
/// Values are immutable in spirit: `grant` returns an updated copy so stages
/// can be chained without sharing mutable state.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionSet {
    pub availability: bool,
    pub study_plan: bool,
    pub questions: bool,
    pub essay: bool,
    pub performance: bool,
    pub activity_history: bool,
    pub plans: bool,
    pub placement_test: bool,
    pub user_exams: bool,
    pub favorite_videos: bool,
    pub notifications: bool,
    pub profile: bool,
    pub on_demand_activities: bool,
    pub virtual_tutor: bool,
}

impl PermissionSet {
    /// All flags off.
    pub fn none() -> Self {
        Self::default()
    }

    /// All flags on.
    pub fn all() -> Self {
        Self::from_features(Feature::ALL)
    }

    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        features
            .into_iter()
            .fold(Self::none(), |set, feature| set.grant(feature))
    }

    pub fn allows(&self, feature: Feature) -> bool {
        *self.slot(feature)
    }

    /// Copy of this set with `feature` switched on.
    #[must_use]
    pub fn grant(mut self, feature: Feature) -> Self {
        *self.slot_mut(feature) = true;
        self
    }

    /// Features currently granted, in declaration order.
    pub fn granted(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.allows(*f))
            .collect()
    }

    /// True when every flag granted by `other` is also granted here.
    pub fn includes(&self, other: &PermissionSet) -> bool {
        other.granted().into_iter().all(|f| self.allows(f))
    }

    fn slot(&self, feature: Feature) -> &bool {
        match feature {
            Feature::Availability => &self.availability,
            Feature::StudyPlan => &self.study_plan,
            Feature::Questions => &self.questions,
            Feature::Essay => &self.essay,
            Feature::Performance => &self.performance,
            Feature::ActivityHistory => &self.activity_history,
            Feature::Plans => &self.plans,
            Feature::PlacementTest => &self.placement_test,
            Feature::UserExams => &self.user_exams,
            Feature::FavoriteVideos => &self.favorite_videos,
            Feature::Notifications => &self.notifications,
            Feature::Profile => &self.profile,
            Feature::OnDemandActivities => &self.on_demand_activities,
            Feature::VirtualTutor => &self.virtual_tutor,
        }
    }

    fn slot_mut(&mut self, feature: Feature) -> &mut bool {
        match feature {
            Feature::Availability => &mut self.availability,
            Feature::StudyPlan => &mut self.study_plan,
            Feature::Questions => &mut self.questions,
            Feature::Essay => &mut self.essay,
            Feature::Performance => &mut self.performance,
            Feature::ActivityHistory => &mut self.activity_history,
            Feature::Plans => &mut self.plans,
            Feature::PlacementTest => &mut self.placement_test,
            Feature::UserExams => &mut self.user_exams,
            Feature::FavoriteVideos => &mut self.favorite_videos,
            Feature::Notifications => &mut self.notifications,
            Feature::Profile => &mut self.profile,
            Feature::OnDemandActivities => &mut self.on_demand_activities,
            Feature::VirtualTutor => &mut self.virtual_tutor,
        }
    }
}
