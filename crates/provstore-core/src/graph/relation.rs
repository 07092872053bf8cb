//! The closed sum type of PROV relations.

use chrono::{DateTime, Utc};

use crate::graph::record::Attributes;
use crate::graph::QualifiedName;

/// Discriminant of [`Relation`], used for reporting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// `wasGeneratedBy`.
    Generation,
    /// `used`.
    Usage,
    /// `wasDerivedFrom`.
    Derivation,
    /// `specializationOf`.
    Specialization,
    /// `wasAttributedTo`.
    Attribution,
    /// `wasAssociatedWith`.
    Association,
    /// `alternateOf`.
    Alternate,
    /// `wasInformedBy`.
    Communication,
    /// `wasStartedBy`.
    Start,
    /// `wasEndedBy`.
    End,
    /// `wasInvalidatedBy`.
    Invalidation,
    /// `hadMember`.
    Membership,
    /// `actedOnBehalfOf`.
    Delegation,
    /// `wasInfluencedBy`.
    Influence,
}

/// A PROV relation between records, referenced by identifier.
///
/// Directionality matters and follows PROV-DM: `Derivation(generated,
/// used)`, `Specialization(specific, general)`, `Usage(activity, entity)`,
/// `Generation(entity, activity)`. Every variant may carry its own
/// relation identifier and attributes; time is present on the kinds that
/// admit one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    /// `wasGeneratedBy(entity, activity)`.
    Generation {
        /// The generated entity.
        entity: QualifiedName,
        /// The generating activity.
        activity: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Generation time.
        time: Option<DateTime<Utc>>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `used(activity, entity)`.
    Usage {
        /// The using activity.
        activity: QualifiedName,
        /// The used entity.
        entity: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Usage time.
        time: Option<DateTime<Utc>>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasDerivedFrom(generated, used)`.
    Derivation {
        /// The derived (newer) entity.
        generated: QualifiedName,
        /// The source (older) entity.
        used: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `specializationOf(specific, general)`.
    Specialization {
        /// The specific entity.
        specific: QualifiedName,
        /// The general entity.
        general: QualifiedName,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasAttributedTo(entity, agent)`.
    Attribution {
        /// The attributed entity.
        entity: QualifiedName,
        /// The responsible agent.
        agent: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasAssociatedWith(activity, agent)`.
    Association {
        /// The activity.
        activity: QualifiedName,
        /// The associated agent.
        agent: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `alternateOf(first, second)`.
    Alternate {
        /// One alternate.
        first: QualifiedName,
        /// The other alternate.
        second: QualifiedName,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasInformedBy(informed, informant)`.
    Communication {
        /// The informed activity.
        informed: QualifiedName,
        /// The informing activity.
        informant: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasStartedBy(activity, trigger)`.
    Start {
        /// The started activity.
        activity: QualifiedName,
        /// The triggering entity.
        trigger: Option<QualifiedName>,
        /// The starting activity.
        starter: Option<QualifiedName>,
        /// Start time.
        time: Option<DateTime<Utc>>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasEndedBy(activity, trigger)`.
    End {
        /// The ended activity.
        activity: QualifiedName,
        /// The triggering entity.
        trigger: Option<QualifiedName>,
        /// The ending activity.
        ender: Option<QualifiedName>,
        /// End time.
        time: Option<DateTime<Utc>>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasInvalidatedBy(entity, activity)`.
    Invalidation {
        /// The invalidated entity.
        entity: QualifiedName,
        /// The invalidating activity.
        activity: QualifiedName,
        /// Invalidation time.
        time: Option<DateTime<Utc>>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `hadMember(collection, member)`.
    Membership {
        /// The collection entity.
        collection: QualifiedName,
        /// The member entity.
        member: QualifiedName,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `actedOnBehalfOf(delegate, responsible)`.
    Delegation {
        /// The delegate agent.
        delegate: QualifiedName,
        /// The responsible agent.
        responsible: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Relation attributes.
        attributes: Attributes,
    },
    /// `wasInfluencedBy(influencee, influencer)`.
    Influence {
        /// The influenced record.
        influencee: QualifiedName,
        /// The influencing record.
        influencer: QualifiedName,
        /// Optional relation identifier.
        id: Option<QualifiedName>,
        /// Relation attributes.
        attributes: Attributes,
    },
}

impl Relation {
    /// The relation kind.
    #[must_use]
    pub fn kind(&self) -> RelationKind {
        match self {
            Self::Generation { .. } => RelationKind::Generation,
            Self::Usage { .. } => RelationKind::Usage,
            Self::Derivation { .. } => RelationKind::Derivation,
            Self::Specialization { .. } => RelationKind::Specialization,
            Self::Attribution { .. } => RelationKind::Attribution,
            Self::Association { .. } => RelationKind::Association,
            Self::Alternate { .. } => RelationKind::Alternate,
            Self::Communication { .. } => RelationKind::Communication,
            Self::Start { .. } => RelationKind::Start,
            Self::End { .. } => RelationKind::End,
            Self::Invalidation { .. } => RelationKind::Invalidation,
            Self::Membership { .. } => RelationKind::Membership,
            Self::Delegation { .. } => RelationKind::Delegation,
            Self::Influence { .. } => RelationKind::Influence,
        }
    }

    /// The relation's own identifier, when it carries one.
    #[must_use]
    pub fn id(&self) -> Option<&QualifiedName> {
        match self {
            Self::Generation { id, .. }
            | Self::Usage { id, .. }
            | Self::Derivation { id, .. }
            | Self::Attribution { id, .. }
            | Self::Association { id, .. }
            | Self::Communication { id, .. }
            | Self::Delegation { id, .. }
            | Self::Influence { id, .. } => id.as_ref(),
            Self::Specialization { .. }
            | Self::Alternate { .. }
            | Self::Start { .. }
            | Self::End { .. }
            | Self::Invalidation { .. }
            | Self::Membership { .. } => None,
        }
    }

    /// The relation attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        match self {
            Self::Generation { attributes, .. }
            | Self::Usage { attributes, .. }
            | Self::Derivation { attributes, .. }
            | Self::Specialization { attributes, .. }
            | Self::Attribution { attributes, .. }
            | Self::Association { attributes, .. }
            | Self::Alternate { attributes, .. }
            | Self::Communication { attributes, .. }
            | Self::Start { attributes, .. }
            | Self::End { attributes, .. }
            | Self::Invalidation { attributes, .. }
            | Self::Membership { attributes, .. }
            | Self::Delegation { attributes, .. }
            | Self::Influence { attributes, .. } => attributes,
        }
    }

    /// The endpoints that decide which side of the backbone/domain split a
    /// relation falls on.
    ///
    /// Start and End are classified by their activity endpoint alone; all
    /// other kinds by both formal endpoints.
    #[must_use]
    pub fn significant_endpoints(&self) -> Vec<&QualifiedName> {
        match self {
            Self::Generation {
                entity, activity, ..
            }
            | Self::Usage {
                activity, entity, ..
            }
            | Self::Invalidation {
                entity, activity, ..
            } => vec![entity, activity],
            Self::Derivation {
                generated, used, ..
            } => vec![generated, used],
            Self::Specialization {
                specific, general, ..
            } => vec![specific, general],
            Self::Attribution { entity, agent, .. } => vec![entity, agent],
            Self::Association {
                activity, agent, ..
            } => vec![activity, agent],
            Self::Alternate { first, second, .. } => vec![first, second],
            Self::Communication {
                informed,
                informant,
                ..
            } => vec![informed, informant],
            Self::Start { activity, .. } | Self::End { activity, .. } => vec![activity],
            Self::Membership {
                collection, member, ..
            } => vec![collection, member],
            Self::Delegation {
                delegate,
                responsible,
                ..
            } => vec![delegate, responsible],
            Self::Influence {
                influencee,
                influencer,
                ..
            } => vec![influencee, influencer],
        }
    }

    /// Structural equality: same variant, endpoints, identifier and
    /// attribute multiset.
    #[must_use]
    pub fn structurally_equals(&self, other: &Self) -> bool {
        self.kind() == other.kind()
            && self.id() == other.id()
            && self.significant_endpoints() == other.significant_endpoints()
            && self.attributes().same_multiset(other.attributes())
    }
}
