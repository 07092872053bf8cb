//! CPM structural constraint checker.
//!
//! [`check_cpm_constraints`] applies the fixed CPM rule-set over one bundle
//! whose backbone has already been classified. Rules execute in a fixed
//! order and the first failing rule determines the reported violation —
//! reordering changes user-visible messages for documents with multiple
//! violations and must not be done.
//!
//! The violation messages are part of the external contract: downstream
//! tooling and the HTTP layer match on them literally.


use std::collections::BTreeSet;

use thiserror::Error;

use crate::graph::{Bundle, Element, QualifiedName, Relation};
use crate::vocab;

/// A violated CPM constraint.
///
/// The `#[error]` texts are the contract messages; `Display` output is
/// reused verbatim in HTTP response bodies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CpmViolation {
    /// A relation spans the backbone and the domain-specific subgraph
    /// outside the permitted anchoring edges.
    #[error("Unexpected relation between backbone and domain-specific entity")]
    BackboneDomainLeakage,

    /// The main activity generated an entity that is not a forward
    /// connector.
    #[error("Main activity generated entity that is not forward connector")]
    MainActivityGeneratedNonConnector,

    /// The main activity used an entity that is not a backward connector.
    #[error("Main activity used entity that is not backward connector")]
    MainActivityUsedNonConnector,

    /// A forward connector is neither generated exactly once by the main
    /// activity nor derived from exactly one other connector.
    #[error(
        "Forward connector [{connector}] has many generations or is missing one, or is not derived from other connector."
    )]
    ForwardConnectorClosure {
        /// The offending connector.
        connector: String,
    },

    /// A forward connector is generated by an activity other than the main
    /// one.
    #[error("Forward connector [{connector}] generated by activity other than main one.")]
    ForwardConnectorForeignGeneration {
        /// The offending connector.
        connector: String,
    },

    /// A forward connector is derived from a record that is not a
    /// connector.
    #[error(
        "Forward connector [{connector}] derived from entity other than forward or backward connector."
    )]
    ForwardConnectorDerivedFromNonConnector {
        /// The offending connector.
        connector: String,
    },

    /// A receiver-attributed forward connector lacks its specialization to
    /// the general connector.
    #[error(
        "Forward connector [{connector}] is not general one and not specialized from other forward connector."
    )]
    ForwardConnectorNotSpecialized {
        /// The offending connector.
        connector: String,
    },

    /// A specialized forward connector is not attributed to exactly one
    /// receiver agent.
    #[error("Receiver agent is not attributed to forward connector")]
    ReceiverAgentNotAttributed,

    /// A backward connector is neither used exactly once by the main
    /// activity nor the source of a redundant-connector derivation.
    #[error(
        "Backward connector [{connector}] has many usages or is missing one or nothing was derived from it."
    )]
    BackwardConnectorClosure {
        /// The offending connector.
        connector: String,
    },

    /// A backward connector participates in a derivation whose other
    /// endpoint is not a connector.
    #[error("Backward connector is related to entity that is not connector by derivation")]
    BackwardConnectorDerivationNonConnector,

    /// A backward connector has sender agents in scope but no attribution
    /// relation.
    #[error("Sender agent is not attributed to backward connector")]
    SenderAgentNotAttributed,

    /// A backward connector has no sender agent record at all.
    #[error("Backward connector does not have agent attributed")]
    BackwardConnectorMissingAgent,

    /// A connector references the bundle currently being validated.
    #[error("Forward or backward connector references this bundle [{reference}].")]
    ConnectorReferencesThisBundle {
        /// The self-reference as asserted on the connector.
        reference: String,
    },

    /// A connector references the meta-bundle declared by this bundle's
    /// own main activity.
    #[error("Forward or backward connector references this meta bundle [{reference}].")]
    ConnectorReferencesThisMetaBundle {
        /// The self-reference as asserted on the connector.
        reference: String,
    },
}

/// Checks the CPM constraints over an already-classified bundle.
///
/// `forward` and `backward` are the connector sets produced by
/// [`crate::classifier::classify`]; `main_activity` is the bundle's single
/// main activity. Rules run in the fixed order 1-12; the first violation
/// wins.
///
/// # Errors
///
/// Returns the first [`CpmViolation`] encountered.
pub fn check_cpm_constraints(
    bundle: &Bundle,
    forward: &[Element],
    backward: &[Element],
    main_activity: &Element,
) -> Result<(), CpmViolation> {
    let ctx = CheckContext::new(bundle, forward, backward, main_activity);

    ctx.check_backbone_domain_leakage()?;
    ctx.check_main_activity_generations()?;
    ctx.check_main_activity_usages()?;
    ctx.check_forward_connectors()?;
    ctx.check_backward_connectors()?;
    ctx.check_self_references()?;

    Ok(())
}

struct CheckContext<'a> {
    bundle: &'a Bundle,
    forward: &'a [Element],
    backward: &'a [Element],
    main_activity: &'a Element,
    forward_ids: BTreeSet<QualifiedName>,
    backward_ids: BTreeSet<QualifiedName>,
    connector_ids: BTreeSet<QualifiedName>,
    backbone_ids: BTreeSet<QualifiedName>,
}

impl<'a> CheckContext<'a> {
    fn new(
        bundle: &'a Bundle,
        forward: &'a [Element],
        backward: &'a [Element],
        main_activity: &'a Element,
    ) -> Self {
        let forward_ids: BTreeSet<_> = forward.iter().map(|c| c.id().clone()).collect();
        let backward_ids: BTreeSet<_> = backward.iter().map(|c| c.id().clone()).collect();
        let connector_ids: BTreeSet<_> = forward_ids.union(&backward_ids).cloned().collect();

        let mut backbone_ids = connector_ids.clone();
        backbone_ids.insert(main_activity.id().clone());
        for agent in bundle.agents() {
            if agent.has_type(&vocab::cpm_sender_agent())
                || agent.has_type(&vocab::cpm_receiver_agent())
            {
                backbone_ids.insert(agent.id().clone());
            }
        }

        Self {
            bundle,
            forward,
            backward,
            main_activity,
            forward_ids,
            backward_ids,
            connector_ids,
            backbone_ids,
        }
    }

    fn is_main(&self, activity: &QualifiedName) -> bool {
        activity == self.main_activity.id()
    }

    /// Rule 1: no relation may span a backbone record and a domain record
    /// except the permitted anchoring edges. Main-activity generations and
    /// usages are deferred to rules 2/3, which type them precisely.
    fn check_backbone_domain_leakage(&self) -> Result<(), CpmViolation> {
        for relation in self.bundle.relations() {
            let endpoints = relation.significant_endpoints();
            let backbone_count = endpoints
                .iter()
                .filter(|endpoint| self.backbone_ids.contains(*endpoint))
                .count();
            if backbone_count == 0 || backbone_count == endpoints.len() {
                continue;
            }

            let permitted = match relation {
                Relation::Generation { activity, .. } | Relation::Usage { activity, .. } => {
                    self.is_main(activity)
                }
                Relation::Specialization { specific, .. } => self.connector_ids.contains(specific),
                Relation::Derivation {
                    generated, used, ..
                } => {
                    self.connector_ids.contains(generated) || self.connector_ids.contains(used)
                }
                Relation::Attribution { entity, .. } => self.connector_ids.contains(entity),
                _ => false,
            };
            if !permitted {
                return Err(CpmViolation::BackboneDomainLeakage);
            }
        }
        Ok(())
    }

    /// Rule 2: every entity generated by the main activity is a forward
    /// connector.
    fn check_main_activity_generations(&self) -> Result<(), CpmViolation> {
        for relation in self.bundle.relations() {
            if let Relation::Generation {
                entity, activity, ..
            } = relation
            {
                if self.is_main(activity) && !self.forward_ids.contains(entity) {
                    return Err(CpmViolation::MainActivityGeneratedNonConnector);
                }
            }
        }
        Ok(())
    }

    /// Rule 3: every entity used by the main activity is a backward
    /// connector.
    fn check_main_activity_usages(&self) -> Result<(), CpmViolation> {
        for relation in self.bundle.relations() {
            if let Relation::Usage {
                activity, entity, ..
            } = relation
            {
                if self.is_main(activity) && !self.backward_ids.contains(entity) {
                    return Err(CpmViolation::MainActivityUsedNonConnector);
                }
            }
        }
        Ok(())
    }

    fn generations_of(&self, entity: &QualifiedName) -> Vec<&QualifiedName> {
        self.bundle
            .relations()
            .iter()
            .filter_map(|relation| match relation {
                Relation::Generation {
                    entity: generated,
                    activity,
                    ..
                } if generated == entity => Some(activity),
                _ => None,
            })
            .collect()
    }

    fn derivation_sources_of(&self, entity: &QualifiedName) -> Vec<&QualifiedName> {
        self.bundle
            .relations()
            .iter()
            .filter_map(|relation| match relation {
                Relation::Derivation {
                    generated, used, ..
                } if generated == entity => Some(used),
                _ => None,
            })
            .collect()
    }

    fn derivation_targets_of(&self, entity: &QualifiedName) -> Vec<&QualifiedName> {
        self.bundle
            .relations()
            .iter()
            .filter_map(|relation| match relation {
                Relation::Derivation {
                    generated, used, ..
                } if used == entity => Some(generated),
                _ => None,
            })
            .collect()
    }

    fn specialization_generals_of(&self, entity: &QualifiedName) -> Vec<&QualifiedName> {
        self.bundle
            .relations()
            .iter()
            .filter_map(|relation| match relation {
                Relation::Specialization {
                    specific, general, ..
                } if specific == entity => Some(general),
                _ => None,
            })
            .collect()
    }

    fn attribution_count_of(&self, entity: &QualifiedName) -> usize {
        self.bundle
            .relations()
            .iter()
            .filter(|relation| {
                matches!(relation, Relation::Attribution { entity: attributed, .. }
                    if attributed == entity)
            })
            .count()
    }

    fn usages_by_main_of(&self, entity: &QualifiedName) -> usize {
        self.bundle
            .relations()
            .iter()
            .filter(|relation| {
                matches!(relation, Relation::Usage { activity, entity: used, .. }
                    if self.is_main(activity) && used == entity)
            })
            .count()
    }

    /// Rules 4-7 over every forward connector.
    fn check_forward_connectors(&self) -> Result<(), CpmViolation> {
        // Rules 4 and 5: generation/derivation closure and derivation
        // source typing for connectors that are not specializations.
        for connector in self.forward {
            let id = connector.id();
            for source in self.derivation_sources_of(id) {
                if !self.connector_ids.contains(source) {
                    return Err(CpmViolation::ForwardConnectorDerivedFromNonConnector {
                        connector: id.to_string(),
                    });
                }
            }

            let specialized = self
                .specialization_generals_of(id)
                .iter()
                .filter(|general| self.forward_ids.contains(*general))
                .count();
            if specialized >= 1 || self.attribution_count_of(id) >= 1 {
                // Concrete connector: anchored through its specialization
                // and receiver attribution, rules 6/7 take over.
                continue;
            }

            let generations = self.generations_of(id);
            let by_main = generations
                .iter()
                .filter(|activity| self.is_main(activity))
                .count();
            let derivations = self.derivation_sources_of(id).len();

            let generated_once_by_main =
                generations.len() == 1 && by_main == 1 && derivations == 0;
            let derived_once = generations.is_empty() && derivations == 1;
            if generated_once_by_main || derived_once {
                continue;
            }
            if generations.len() == 1 && by_main == 0 && derivations == 0 {
                return Err(CpmViolation::ForwardConnectorForeignGeneration {
                    connector: id.to_string(),
                });
            }
            return Err(CpmViolation::ForwardConnectorClosure {
                connector: id.to_string(),
            });
        }

        // Rule 6: a receiver-attributed connector that is not the general
        // one must specialize exactly one forward connector.
        for connector in self.forward {
            let id = connector.id();
            let is_general = self.forward.iter().any(|other| {
                other.id() != id
                    && self
                        .specialization_generals_of(other.id())
                        .iter()
                        .any(|general| *general == id)
            });
            if is_general {
                continue;
            }
            let specialized = self
                .specialization_generals_of(id)
                .iter()
                .filter(|general| self.forward_ids.contains(*general))
                .count();
            if self.attribution_count_of(id) >= 1 && specialized != 1 {
                return Err(CpmViolation::ForwardConnectorNotSpecialized {
                    connector: id.to_string(),
                });
            }
        }

        // Rule 7: a specialized connector must be attributed to exactly one
        // receiver agent.
        for connector in self.forward {
            let id = connector.id();
            let specialized = self
                .specialization_generals_of(id)
                .iter()
                .filter(|general| self.forward_ids.contains(*general))
                .count();
            if specialized == 1 && self.attribution_count_of(id) != 1 {
                return Err(CpmViolation::ReceiverAgentNotAttributed);
            }
        }

        Ok(())
    }

    /// Rules 8-10 over every backward connector.
    fn check_backward_connectors(&self) -> Result<(), CpmViolation> {
        let has_sender_agent = self
            .bundle
            .agents()
            .any(|agent| agent.has_type(&vocab::cpm_sender_agent()));

        for connector in self.backward {
            let id = connector.id();

            // Rule 9: any derivation touching a backward connector must
            // have a connector on its other endpoint.
            for source in self.derivation_sources_of(id) {
                if !self.connector_ids.contains(source) {
                    return Err(CpmViolation::BackwardConnectorDerivationNonConnector);
                }
            }
            for target in self.derivation_targets_of(id) {
                if !self.connector_ids.contains(target) {
                    return Err(CpmViolation::BackwardConnectorDerivationNonConnector);
                }
            }

            // Rule 8: used exactly once by the main activity, or exactly
            // one more-redundant connector derived from it.
            let usages_by_main = self.usages_by_main_of(id);
            let derived_from_it = self
                .derivation_targets_of(id)
                .iter()
                .filter(|target| self.connector_ids.contains(*target))
                .count();
            let used_once = usages_by_main == 1;
            let relayed = usages_by_main == 0 && derived_from_it == 1;
            if !(used_once || relayed) {
                return Err(CpmViolation::BackwardConnectorClosure {
                    connector: id.to_string(),
                });
            }

            // Rule 10: sender attribution, with distinct messages for a
            // missing relation vs a missing agent record.
            if self.attribution_count_of(id) != 1 {
                if has_sender_agent {
                    return Err(CpmViolation::SenderAgentNotAttributed);
                }
                return Err(CpmViolation::BackwardConnectorMissingAgent);
            }
        }
        Ok(())
    }

    /// Rules 11 and 12: a connector must not reference the bundle being
    /// validated or its own meta-bundle.
    fn check_self_references(&self) -> Result<(), CpmViolation> {
        let own_uri = self.bundle.uri();
        let own_meta = self
            .main_activity
            .attributes()
            .first(&vocab::cpm_referenced_meta_bundle_id())
            .and_then(|value| value.as_qualified().cloned());

        for connector in self.forward.iter().chain(self.backward.iter()) {
            if let Some(reference) = connector
                .attributes()
                .first(&vocab::cpm_referenced_bundle_id())
                .and_then(|value| value.as_qualified())
            {
                if reference.uri() == own_uri {
                    return Err(CpmViolation::ConnectorReferencesThisBundle {
                        reference: reference.to_string(),
                    });
                }
            }
            if let (Some(own_meta), Some(reference)) = (
                own_meta.as_ref(),
                connector
                    .attributes()
                    .first(&vocab::cpm_referenced_meta_bundle_id())
                    .and_then(|value| value.as_qualified()),
            ) {
                if reference == own_meta {
                    return Err(CpmViolation::ConnectorReferencesThisMetaBundle {
                        reference: reference.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
