use std::sync::Arc;
use wardencore::ac::{
    event::{DecisionEvent, DecisionSink, LogSink},
    AccessControlled,
    Permission,
    Privilege,
};

use crate::{
    catalog::{Action, AttributeOp, Catalog, PrivilegeRef},
    error::{Denial, Error, Target, TargetId},
    grant::{GRANT_CLASS, GRANT_PRIVILEGE},
    matcher,
    principal::{Context, Principal},
};

/// The decision engine; immutable once built and shareable across
/// threads.
#[derive(Clone)]
pub struct Engine {
    catalog: Arc<Catalog>,
    sink: Arc<dyn DecisionSink>,
}

fn target_of(object: &dyn AccessControlled) -> Target {
    Target {
        class_name: object.class_name().to_string(),
        id: object.id()
            .map(TargetId::Saved)
            .unwrap_or(TargetId::Unsaved),
        name: object.display_name().map(str::to_string),
    }
}

impl Engine {
    pub fn new(catalog: impl Into<Arc<Catalog>>) -> Self {
        Self {
            catalog: catalog.into(),
            sink: Arc::new(LogSink),
        }
    }

    pub fn sink(mut self, val: Arc<dyn DecisionSink>) -> Self {
        self.sink = val;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Permissions conferring `privilege` on some objects of the class,
    /// directly, through the wildcard, or through implication.
    pub fn all_permissions<'p>(
        &self,
        who: &'p Principal,
        privilege: &Privilege,
        class_name: &str,
    ) -> Vec<&'p Permission> {
        let base = match self.catalog.base_class(class_name) {
            Some(base) => base,
            None => return Vec::new(),
        };
        who.permissions()
            .iter()
            .filter(|p| p.class_name.covers(base))
            .filter(|p| matcher::covers(&self.catalog, p, privilege, base))
            .collect()
    }

    pub fn can(
        &self,
        who: &Principal,
        privilege: &Privilege,
        object: &dyn AccessControlled,
    ) -> bool {
        let user_id = who.user().id;
        self.all_permissions(who, privilege, object.class_name())
            .into_iter()
            .any(|p| matcher::matches(&self.catalog, p, object, user_id))
    }

    /// Whether the user holds `privilege` on at least some conceivable
    /// object of the class.
    pub fn could_ever(
        &self,
        who: &Principal,
        privilege: &Privilege,
        class_name: &str,
    ) -> bool {
        !self.all_permissions(who, privilege, class_name).is_empty()
    }

    /// Whether the decision would still be positive if the user's direct
    /// assignments to `role_id` were removed.
    pub fn could_without_role(
        &self,
        who: &Principal,
        role_id: i64,
        privilege: &Privilege,
        object: &dyn AccessControlled,
    ) -> bool {
        let roles = who.graph().resolve_without(who.assignments(), who.as_of(), role_id);
        let user_id = who.user().id;
        self.all_permissions(who, privilege, object.class_name())
            .into_iter()
            .filter(|p| roles.contains(&p.role_id))
            .any(|p| matcher::matches(&self.catalog, p, object, user_id))
    }

    /// Evaluates a privilege reference against the object, or against the
    /// associate it names; an absent associate is never permitted.
    pub fn permits_ref(
        &self,
        who: &Principal,
        privilege: &PrivilegeRef,
        object: &dyn AccessControlled,
    ) -> bool {
        match &privilege.association {
            None => self.can(who, &privilege.privilege, object),
            Some(association) => object.associate(association)
                .map(|associate| self.can(who, &privilege.privilege, associate))
                .unwrap_or(false),
        }
    }

    fn could_ever_ref(
        &self,
        who: &Principal,
        privilege: &PrivilegeRef,
        class_name: &str,
    ) -> bool {
        match &privilege.association {
            None => self.could_ever(who, &privilege.privilege, class_name),
            Some(association) => self.catalog.schema(class_name)
                .and_then(|schema| schema.association(association))
                .map(|a| self.could_ever(who, &privilege.privilege, &a.class_name))
                .unwrap_or(false),
        }
    }

    /// Whether the user could create some object of the class: the create
    /// privilege must be held somewhere, as must the privilege to associate
    /// with every mandatory associate that requires one.
    pub fn permits_create(&self, who: &Principal, class_name: &str) -> bool {
        let schema = match self.catalog.schema(class_name) {
            Some(schema) => schema,
            None => return true,
        };
        if let Some(privilege) = schema.actions.get(&Action::Create) {
            if !self.could_ever_ref(who, privilege, class_name) {
                return false;
            }
        }
        schema.associations()
            .iter()
            .filter(|a| !a.nullable)
            .all(|a| match self.catalog.associate_privilege(&a.class_name, schema.name(), &a.name) {
                Some(privilege) => self.could_ever(who, privilege, &a.class_name),
                None => true,
            })
    }

    pub fn permits_action(
        &self,
        who: &Principal,
        action: Action,
        object: &dyn AccessControlled,
    ) -> bool {
        let permitted = self.catalog.action_privilege(object.class_name(), action)
            .map(|privilege| self.permits_ref(who, privilege, object))
            .unwrap_or(true);
        if !permitted {
            return false;
        }
        if action == Action::Destroy {
            return self.associate_privileges(object, Catalog::dissociate_privilege)
                .into_iter()
                .all(|(privilege, associate)| self.can(who, privilege, associate));
        }
        true
    }

    /// Whether the user may set the attribute: the initialize guard applies
    /// to unsaved objects, the update guard to saved ones.
    pub fn permits_update_attr(
        &self,
        who: &Principal,
        object: &dyn AccessControlled,
        attribute: &str,
    ) -> bool {
        let op = match object.id() {
            None => AttributeOp::Initialize,
            Some(_) => AttributeOp::Update,
        };
        self.catalog.attribute_guard(object.class_name(), op, attribute)
            .map(|privilege| self.permits_ref(who, privilege, object))
            .unwrap_or(true)
    }

    pub fn permits_read_attr(
        &self,
        who: &Principal,
        object: &dyn AccessControlled,
        attribute: &str,
    ) -> bool {
        self.catalog.attribute_guard(object.class_name(), AttributeOp::Read, attribute)
            .map(|privilege| self.permits_ref(who, privilege, object))
            .unwrap_or(true)
    }

    // the present associates of the object paired with the privilege
    // declared on them for the association
    fn associate_privileges<'o>(
        &'o self,
        object: &'o dyn AccessControlled,
        lookup: fn(&'o Catalog, &'o str, &'o str, &'o str) -> Option<&'o Privilege>,
    ) -> Vec<(&'o Privilege, &'o dyn AccessControlled)> {
        let schema = match self.catalog.schema(object.class_name()) {
            Some(schema) => schema,
            None => return Vec::new(),
        };
        schema.associations()
            .iter()
            .filter_map(|a| {
                let privilege = lookup(&self.catalog, &a.class_name, schema.name(), &a.name)?;
                let associate = object.associate(&a.name)?;
                Some((privilege, associate))
            })
            .collect()
    }
}

// Imperative checks; each records exactly one decision event per
// privilege checked.
impl Engine {
    fn record(
        &self,
        who: Option<&Principal>,
        privilege: &Privilege,
        class_name: &str,
        resource_id: Option<i64>,
        success: bool,
    ) {
        self.sink.record(&DecisionEvent {
            privilege: privilege.to_string(),
            resource_class: class_name.to_string(),
            resource_id,
            user_id: who.map(|p| p.user().id),
            user_name: who.map(|p| p.user().name.clone()),
            success,
        });
    }

    pub(crate) fn record_grant(&self, who: &Principal, candidate: &Permission, success: bool) {
        self.record(
            Some(who),
            &Privilege::named(GRANT_PRIVILEGE),
            GRANT_CLASS,
            candidate.id,
            success,
        );
    }

    fn deny(&self, privilege: &Privilege, target: Target) -> Error {
        Denial {
            privilege: privilege.to_string(),
            target,
        }.into()
    }

    /// Raises unless the acting user holds `privilege` on the object.
    pub fn require(
        &self,
        ctx: &Context,
        privilege: &Privilege,
        object: &dyn AccessControlled,
    ) -> Result<(), Error> {
        let who = ctx.require_acting(privilege.as_str())?;
        let success = self.can(who, privilege, object);
        self.record(Some(who), privilege, object.class_name(), object.id(), success);
        if success {
            Ok(())
        } else {
            Err(self.deny(privilege, target_of(object)))
        }
    }

    pub fn require_ref(
        &self,
        ctx: &Context,
        privilege: &PrivilegeRef,
        object: &dyn AccessControlled,
    ) -> Result<(), Error> {
        let association = match &privilege.association {
            None => return self.require(ctx, &privilege.privilege, object),
            Some(association) => association,
        };
        match object.associate(association) {
            Some(associate) => self.require(ctx, &privilege.privilege, associate),
            None => {
                let who = ctx.require_acting(privilege.privilege.as_str())?;
                let class_name = self.catalog.schema(object.class_name())
                    .and_then(|schema| schema.association(association))
                    .map(|a| a.class_name.as_str())
                    .unwrap_or(association.as_str());
                self.record(Some(who), &privilege.privilege, class_name, None, false);
                Err(self.deny(&privilege.privilege, Target {
                    class_name: class_name.to_string(),
                    id: TargetId::Missing,
                    name: None,
                }))
            }
        }
    }

    /// Raises unless the acting user could create some object of the
    /// class.
    pub fn require_create(&self, ctx: &Context, class_name: &str) -> Result<(), Error> {
        let privilege = Privilege::named(Action::Create.as_str());
        let who = ctx.require_acting(privilege.as_str())?;
        let success = self.permits_create(who, class_name);
        self.record(Some(who), &privilege, class_name, None, success);
        if success {
            Ok(())
        } else {
            Err(self.deny(&privilege, Target {
                class_name: class_name.to_string(),
                id: TargetId::Unsaved,
                name: None,
            }))
        }
    }

    /// The guard for a lifecycle action on the object.  Creating an object
    /// also associates it with its associates, destroying it dissociates
    /// it from them.
    pub fn require_action(
        &self,
        ctx: &Context,
        action: Action,
        object: &dyn AccessControlled,
    ) -> Result<(), Error> {
        if let Some(privilege) = self.catalog.action_privilege(object.class_name(), action) {
            self.require_ref(ctx, privilege, object)?;
        }
        let lookup = match action {
            Action::Create => Catalog::associate_privilege,
            Action::Destroy => Catalog::dissociate_privilege,
            _ => return Ok(()),
        };
        for (privilege, associate) in self.associate_privileges(object, lookup) {
            self.require(ctx, privilege, associate)?;
        }
        Ok(())
    }

    /// The guard for writing an attribute.  When the attribute is the
    /// foreign key of an association, the current associate of a saved
    /// object must permit dissociation and the incoming associate must
    /// permit association.
    pub fn check_attribute_write(
        &self,
        ctx: &Context,
        object: &dyn AccessControlled,
        attribute: &str,
        incoming: Option<&dyn AccessControlled>,
    ) -> Result<(), Error> {
        let op = match object.id() {
            None => AttributeOp::Initialize,
            Some(_) => AttributeOp::Update,
        };
        if let Some(privilege) = self.catalog.attribute_guard(object.class_name(), op, attribute) {
            self.require_ref(ctx, privilege, object)?;
        }
        let schema = match self.catalog.schema(object.class_name()) {
            Some(schema) => schema,
            None => return Ok(()),
        };
        let association = match schema.associations()
            .iter()
            .find(|a| a.foreign_key == attribute)
        {
            Some(association) => association,
            None => return Ok(()),
        };
        if object.id().is_some() {
            let current = object.associate(&association.name);
            let privilege = self.catalog.dissociate_privilege(
                &association.class_name,
                schema.name(),
                &association.name,
            );
            if let (Some(current), Some(privilege)) = (current, privilege) {
                self.require(ctx, privilege, current)?;
            }
        }
        let privilege = self.catalog.associate_privilege(
            &association.class_name,
            schema.name(),
            &association.name,
        );
        if let (Some(incoming), Some(privilege)) = (incoming, privilege) {
            self.require(ctx, privilege, incoming)?;
        }
        Ok(())
    }
}
