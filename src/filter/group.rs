//! The filter tree: conditions and nested AND/OR groups.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operator::FilterOperator;
use super::value::FilterValue;
use crate::composition::ReportComposition;
use crate::error::{ObjectKind, ReportError, ReportResult};
use crate::schema::{FieldRef, SchemaCatalog, SemanticType};

/// Unique identifier of a condition or group within a filter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(Uuid);

impl FilterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FilterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// A single `field operator value` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub id: FilterId,
    pub field: FieldRef,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: FilterValue,
}

impl FilterCondition {
    /// A condition with the type's default operator and no value.
    pub fn new(field: FieldRef, ty: SemanticType) -> Self {
        Self {
            id: FilterId::new(),
            field,
            operator: FilterOperator::default_for(ty),
            value: FilterValue::Unset,
        }
    }

    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_value(mut self, value: FilterValue) -> Self {
        self.value = value;
        self
    }

    /// Conditions without a value are not yet active.
    pub fn is_active(&self) -> bool {
        !self.value.is_unset()
    }
}

/// A child of a filter group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FilterNode {
    Condition(FilterCondition),
    Group(FilterGroup),
}

impl FilterNode {
    pub fn id(&self) -> FilterId {
        match self {
            FilterNode::Condition(c) => c.id,
            FilterNode::Group(g) => g.id,
        }
    }
}

/// An ordered AND/OR combination of conditions and nested groups.
///
/// The root group always exists; an empty root applies no filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub id: FilterId,
    pub combinator: Combinator,
    #[serde(default)]
    pub children: Vec<FilterNode>,
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self::new(Combinator::And)
    }
}

impl FilterGroup {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            id: FilterId::new(),
            combinator,
            children: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.children.push(FilterNode::Condition(condition));
        self
    }

    pub fn with_group(mut self, group: FilterGroup) -> Self {
        self.children.push(FilterNode::Group(group));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// All conditions in the tree, depth first.
    pub fn conditions(&self) -> Vec<&FilterCondition> {
        let mut result = Vec::new();
        self.collect_conditions(&mut result);
        result
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a FilterCondition>) {
        for child in &self.children {
            match child {
                FilterNode::Condition(c) => out.push(c),
                FilterNode::Group(g) => g.collect_conditions(out),
            }
        }
    }

    /// Fields referenced by any condition, in tree order, without duplicates.
    pub fn referenced_fields(&self) -> Vec<FieldRef> {
        let mut fields: Vec<FieldRef> = Vec::new();
        for condition in self.conditions() {
            if !fields.contains(&condition.field) {
                fields.push(condition.field.clone());
            }
        }
        fields
    }

    pub fn condition(&self, id: FilterId) -> Option<&FilterCondition> {
        self.conditions().into_iter().find(|c| c.id == id)
    }

    fn condition_mut(&mut self, id: FilterId) -> Option<&mut FilterCondition> {
        for child in &mut self.children {
            match child {
                FilterNode::Condition(c) if c.id == id => return Some(c),
                FilterNode::Condition(_) => {}
                FilterNode::Group(g) => {
                    if let Some(c) = g.condition_mut(id) {
                        return Some(c);
                    }
                }
            }
        }
        None
    }

    fn group_mut(&mut self, id: FilterId) -> Option<&mut FilterGroup> {
        if self.id == id {
            return Some(self);
        }
        for child in &mut self.children {
            if let FilterNode::Group(g) = child {
                if let Some(found) = g.group_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn require_condition(&mut self, id: FilterId) -> ReportResult<&mut FilterCondition> {
        self.condition_mut(id)
            .ok_or_else(|| ReportError::not_found(ObjectKind::Condition, id.to_string()))
    }

    fn require_group(&mut self, id: FilterId) -> ReportResult<&mut FilterGroup> {
        self.group_mut(id)
            .ok_or_else(|| ReportError::not_found(ObjectKind::Condition, id.to_string()))
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Append a default condition to the group `group_id`.
    ///
    /// The condition uses the composition's first field, that field's first
    /// operator, and no value.
    pub fn add_condition(
        &mut self,
        group_id: FilterId,
        composition: &ReportComposition,
        catalog: &SchemaCatalog,
    ) -> ReportResult<FilterId> {
        let field = composition.first_field(catalog)?;
        let ty = catalog.resolve(&field)?.semantic_type;
        let group = self.require_group(group_id)?;
        let condition = FilterCondition::new(field, ty);
        let id = condition.id;
        group.children.push(FilterNode::Condition(condition));
        Ok(id)
    }

    /// Append an empty nested group to the group `parent_id`.
    pub fn add_group(&mut self, parent_id: FilterId, combinator: Combinator) -> ReportResult<FilterId> {
        let parent = self.require_group(parent_id)?;
        let group = FilterGroup::new(combinator);
        let id = group.id;
        parent.children.push(FilterNode::Group(group));
        Ok(id)
    }

    pub fn set_combinator(&mut self, group_id: FilterId, combinator: Combinator) -> ReportResult<()> {
        self.require_group(group_id)?.combinator = combinator;
        Ok(())
    }

    /// Point a condition at another field.
    ///
    /// The field must belong to a table of the composition. An operator not
    /// offered for the new field's type is reset to that type's default, and
    /// a value that cannot be read as the new type is cleared.
    pub fn set_field(
        &mut self,
        id: FilterId,
        field: FieldRef,
        composition: &ReportComposition,
        catalog: &SchemaCatalog,
    ) -> ReportResult<()> {
        if !composition.contains_table(&field.table) {
            return Err(ReportError::not_found(ObjectKind::Table, &field.table));
        }
        let ty = catalog.resolve(&field)?.semantic_type;
        let condition = self.require_condition(id)?;

        if !condition.operator.is_valid_for(ty) {
            condition.operator = FilterOperator::default_for(ty);
        }
        if !condition.value.matches_type(ty) {
            condition.value = FilterValue::parse(&field, &condition.value.raw(), ty)
                .unwrap_or(FilterValue::Unset);
        }
        condition.field = field;
        Ok(())
    }

    /// Change a condition's operator; it must be offered for the field's type.
    pub fn set_operator(
        &mut self,
        id: FilterId,
        operator: FilterOperator,
        catalog: &SchemaCatalog,
    ) -> ReportResult<()> {
        let condition = self.require_condition(id)?;
        let ty = catalog.resolve(&condition.field)?.semantic_type;
        if !operator.is_valid_for(ty) {
            return Err(ReportError::InvalidOperator {
                field: condition.field.key(),
                operator: operator.to_string(),
                semantic_type: ty,
            });
        }
        condition.operator = operator;
        Ok(())
    }

    /// Set a condition's value from raw input, coercing to the field's type.
    pub fn set_value(&mut self, id: FilterId, raw: &str, catalog: &SchemaCatalog) -> ReportResult<()> {
        let condition = self.require_condition(id)?;
        let ty = catalog.resolve(&condition.field)?.semantic_type;
        condition.value = FilterValue::parse(&condition.field, raw, ty)?;
        Ok(())
    }

    /// Remove a condition or nested group anywhere in the tree.
    pub fn remove(&mut self, id: FilterId) -> ReportResult<()> {
        if self.remove_node(id) {
            Ok(())
        } else {
            Err(ReportError::not_found(ObjectKind::Condition, id.to_string()))
        }
    }

    fn remove_node(&mut self, id: FilterId) -> bool {
        if let Some(pos) = self.children.iter().position(|c| c.id() == id) {
            self.children.remove(pos);
            return true;
        }
        self.children.iter_mut().any(|child| match child {
            FilterNode::Group(g) => g.remove_node(id),
            FilterNode::Condition(_) => false,
        })
    }

    /// Drop every condition; the combinator is kept.
    pub fn clear(&mut self) {
        self.children.clear();
    }

    /// Remove every condition on a table.
    ///
    /// Nested groups left empty by the removal are dropped too. Returns the
    /// number of conditions removed.
    pub fn remove_table_references(&mut self, table: &str) -> usize {
        let mut removed = 0;
        self.children.retain_mut(|child| match child {
            FilterNode::Condition(c) => {
                if c.field.table == table {
                    removed += 1;
                    false
                } else {
                    true
                }
            }
            FilterNode::Group(g) => {
                let had_children = !g.children.is_empty();
                let n = g.remove_table_references(table);
                removed += n;
                !(had_children && n > 0 && g.children.is_empty())
            }
        });
        removed
    }

    /// Check every condition against the catalog and the composition.
    ///
    /// Fails on the first unknown field, foreign table, operator outside
    /// the field's set, or value of the wrong type.
    pub fn validate(&self, composition: &ReportComposition, catalog: &SchemaCatalog) -> ReportResult<()> {
        for condition in self.conditions() {
            if !composition.contains_table(&condition.field.table) {
                return Err(ReportError::not_found(ObjectKind::Table, &condition.field.table));
            }
            let ty = catalog.resolve(&condition.field)?.semantic_type;
            if !condition.operator.is_valid_for(ty) {
                return Err(ReportError::InvalidOperator {
                    field: condition.field.key(),
                    operator: condition.operator.to_string(),
                    semantic_type: ty,
                });
            }
            if !condition.value.matches_type(ty) {
                return Err(ReportError::InvalidFilterValue {
                    field: condition.field.key(),
                    value: condition.value.raw(),
                    expected: ty,
                });
            }
        }
        Ok(())
    }

    /// Bring conditions in line with the catalog's current field types.
    ///
    /// Invalid operators are reset to the type default and mistyped values
    /// are cleared. Returns how many conditions changed.
    pub fn revalidate(&mut self, catalog: &SchemaCatalog) -> usize {
        let mut changed = 0;
        for child in &mut self.children {
            match child {
                FilterNode::Condition(c) => {
                    let Ok(column) = catalog.resolve(&c.field) else {
                        continue;
                    };
                    let ty = column.semantic_type;
                    let mut touched = false;
                    if !c.operator.is_valid_for(ty) {
                        c.operator = FilterOperator::default_for(ty);
                        touched = true;
                    }
                    if !c.value.matches_type(ty) {
                        c.value = FilterValue::Unset;
                        touched = true;
                    }
                    if touched {
                        changed += 1;
                    }
                }
                FilterNode::Group(g) => changed += g.revalidate(catalog),
            }
        }
        changed
    }
}
