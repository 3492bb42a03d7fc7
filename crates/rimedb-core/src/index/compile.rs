use crate::{
    error::CompileError,
    index::function::{ConstantCheck, IndexField, IndexFunction, Literal, NullCheck},
    model::{
        ColumnModel, ColumnPath, ColumnType, EntityModel, FieldReader, QueryModel, leaves,
    },
    predicate::{Compare, CompareOp, Operand, Predicate},
};
use std::{collections::HashSet, sync::Arc};

///
/// compile
///
/// One-shot compilation of an (entity, query) pair into an
/// [`IndexFunction`]. Pure and synchronous; run once at schema setup and
/// cache the artifact per pair. Any failure is terminal and nothing
/// partially built escapes.
///

pub fn compile<E>(
    entity: &EntityModel<E>,
    query: &QueryModel,
) -> Result<IndexFunction<E>, CompileError> {
    let selected = select_fields(query);
    let null_checks = null_checks(entity, &selected)?;
    let constant_checks = match query.predicate() {
        Some(tree) => fold_constants(entity, tree)?,
        None => Vec::new(),
    };
    let fields = bind_fields(entity, selected)?;

    Ok(IndexFunction::new(
        query.name().to_string(),
        fields,
        null_checks,
        constant_checks,
    ))
}

/// Ordered, duplicate-free selection of the leaf columns stored in the
/// index key.
///
/// Parameter columns come first, each once in use order, so a range test
/// on one column does not duplicate its data in the index record. Order-by
/// columns matching the selected prefix positionally are skipped; at the
/// first divergence the diverging column is appended and the comparison
/// walk stops, after which every remaining order-by column is appended
/// as-is, without further deduplication.
fn select_fields(query: &QueryModel) -> Vec<Arc<ColumnModel>> {
    let mut fields: Vec<Arc<ColumnModel>> = Vec::new();
    for column in leaves(query.parameters()) {
        if !fields.contains(&column) {
            fields.push(column);
        }
    }

    let mut order_by = leaves(query.order_by()).into_iter();
    let mut position = 0;
    while position < fields.len() {
        let Some(column) = order_by.next() else {
            break;
        };
        if fields[position] != column {
            fields.push(column);
            break;
        }
        position += 1;
    }
    fields.extend(order_by);

    fields
}

/// Null-check pass: nullable ancestors (outermost first) and nullable
/// leaves, each at most once, in field-selection order. Also where
/// unsupported scalar types are rejected, before any artifact exists.
fn null_checks<E>(
    entity: &EntityModel<E>,
    fields: &[Arc<ColumnModel>],
) -> Result<Vec<NullCheck<E>>, CompileError> {
    let mut checks = Vec::new();
    let mut checked: HashSet<ColumnPath> = HashSet::new();

    for field in fields {
        check_parents(entity, field.parent(), &mut checked, &mut checks)?;

        let Some(ty) = field.scalar_type() else {
            return Err(CompileError::Instantiation {
                reason: format!("column '{}' selected as a leaf but is nested", field.path()),
            });
        };
        if ty == ColumnType::Unsupported {
            return Err(CompileError::UnsupportedFieldType {
                path: field.path().clone(),
                ty,
            });
        }
        if ty.is_nullable() && checked.insert(field.path().clone()) {
            checks.push(NullCheck::new(Arc::clone(field), reader(entity, field)?));
        }
    }

    Ok(checks)
}

fn check_parents<E>(
    entity: &EntityModel<E>,
    parent: Option<Arc<ColumnModel>>,
    checked: &mut HashSet<ColumnPath>,
    checks: &mut Vec<NullCheck<E>>,
) -> Result<(), CompileError> {
    let Some(column) = parent else {
        return Ok(());
    };
    if !checked.insert(column.path().clone()) {
        return Ok(());
    }

    check_parents(entity, column.parent(), checked, checks)?;
    if column.is_nullable_container() {
        checks.push(NullCheck::new(Arc::clone(&column), reader(entity, &column)?));
    }

    Ok(())
}

/// Walk the predicate tree and extract the checks that fold at compile
/// time. Placeholders contribute nothing here; they are already covered
/// by the parameter fields.
fn fold_constants<E>(
    entity: &EntityModel<E>,
    tree: &Predicate,
) -> Result<Vec<ConstantCheck<E>>, CompileError> {
    let mut checks = Vec::new();
    fold_node(entity, tree, &mut checks)?;
    Ok(checks)
}

fn fold_node<E>(
    entity: &EntityModel<E>,
    node: &Predicate,
    out: &mut Vec<ConstantCheck<E>>,
) -> Result<(), CompileError> {
    match node {
        Predicate::And(children) => {
            for child in children {
                fold_node(entity, child, out)?;
            }
            Ok(())
        }
        // Already reflected in the query's order-by and limit.
        Predicate::Order | Predicate::Limit(_) => Ok(()),
        Predicate::Compare(compare) => fold_compare(entity, compare, out),
        other => Err(CompileError::UnsupportedQueryToken {
            token: other.token().to_string(),
        }),
    }
}

fn fold_compare<E>(
    entity: &EntityModel<E>,
    compare: &Compare,
    out: &mut Vec<ConstantCheck<E>>,
) -> Result<(), CompileError> {
    if compare.op == CompareOp::Ne {
        return Err(CompileError::UnsupportedQueryToken {
            token: compare.op.to_string(),
        });
    }

    let Operand::Field(path) = &compare.lhs else {
        return Err(CompileError::UnsupportedQueryToken {
            token: compare.lhs.token(),
        });
    };
    let column = entity
        .column(path)
        .ok_or_else(|| CompileError::UnsupportedQueryToken {
            token: path.to_string(),
        })?;
    let Some(ty) = column.scalar_type() else {
        return Err(CompileError::UnsupportedQueryToken {
            token: path.to_string(),
        });
    };

    match &compare.rhs {
        // Bound at scan time via the corresponding parameter field.
        Operand::Placeholder => return Ok(()),
        Operand::Field(other) => {
            return Err(CompileError::UnsupportedQueryToken {
                token: other.to_string(),
            });
        }
        Operand::Bool(_) | Operand::Int(_) | Operand::Text(_) => {
            if compare.op.is_ordered() {
                return Err(CompileError::UnsupportedPredicate {
                    path: path.clone(),
                    op: compare.op,
                });
            }
        }
    }

    let literal = match &compare.rhs {
        Operand::Bool(expect) if ty == ColumnType::Bool => Literal::Bool(*expect),
        Operand::Int(expect) if ty.is_integer() => Literal::Int(*expect),
        Operand::Text(text) if ty == ColumnType::Char => {
            let stripped = dequote(text);
            let first = stripped.chars().next().ok_or_else(|| {
                CompileError::UnsupportedQueryToken {
                    token: text.clone(),
                }
            })?;
            Literal::Char(first)
        }
        Operand::Text(text) if ty == ColumnType::Text => Literal::Text(dequote(text).to_string()),
        rhs => {
            return Err(CompileError::UnsupportedQueryToken { token: rhs.token() });
        }
    };

    out.push(ConstantCheck::new(
        column.clone(),
        reader(entity, &column)?,
        literal,
    ));
    Ok(())
}

/// Strip one layer of surrounding quote characters from a string token.
fn dequote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Resolve readers for the selected fields; after this the artifact never
/// touches the entity model again.
fn bind_fields<E>(
    entity: &EntityModel<E>,
    fields: Vec<Arc<ColumnModel>>,
) -> Result<Vec<IndexField<E>>, CompileError> {
    fields
        .into_iter()
        .map(|column| {
            let ty = column
                .scalar_type()
                .ok_or_else(|| CompileError::Instantiation {
                    reason: format!("column '{}' selected as a leaf but is nested", column.path()),
                })?;
            let read = reader(entity, &column)?;
            Ok(IndexField::new(column, ty, read))
        })
        .collect()
}

fn reader<E>(
    entity: &EntityModel<E>,
    column: &Arc<ColumnModel>,
) -> Result<FieldReader<E>, CompileError> {
    entity
        .reader(column.path())
        .ok_or_else(|| CompileError::Instantiation {
            reason: format!(
                "no reader bound for column '{}' of entity '{}'",
                column.path(),
                entity.entity_name()
            ),
        })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{customer_model, person_model};

    fn selected_paths(query: &QueryModel) -> Vec<String> {
        select_fields(query)
            .iter()
            .map(|column| column.path().to_string())
            .collect()
    }

    #[test]
    fn order_by_matching_the_parameter_prefix_is_skipped() {
        let model = person_model();
        let name = model.column(&"name".into()).expect("name column");
        let age = model.column(&"age".into()).expect("age column");
        let active = model.column(&"active".into()).expect("active column");

        let query = QueryModel::new("by_name_age")
            .with_parameters(vec![name, age])
            .with_order_by(vec![
                model.column(&"name".into()).expect("name column"),
                model.column(&"age".into()).expect("age column"),
                active,
            ]);

        assert_eq!(selected_paths(&query), vec!["name", "age", "active"]);
    }

    #[test]
    fn range_parameters_on_one_column_are_not_duplicated() {
        let model = person_model();
        let query = QueryModel::new("age_between").with_parameters(vec![
            model.column(&"age".into()).expect("age column"),
            model.column(&"age".into()).expect("age column"),
        ]);

        assert_eq!(selected_paths(&query), vec!["age"]);
    }

    #[test]
    fn first_order_by_divergence_stops_deduplication() {
        // Documented early-termination behavior: after the first mismatch
        // every remaining order-by column is appended without dedup, so a
        // parameter column can repeat.
        let model = person_model();
        let query = QueryModel::new("diverging")
            .with_parameters(vec![model.column(&"age".into()).expect("age column")])
            .with_order_by(vec![
                model.column(&"name".into()).expect("name column"),
                model.column(&"age".into()).expect("age column"),
            ]);

        assert_eq!(selected_paths(&query), vec!["age", "name", "age"]);
    }

    #[test]
    fn nested_parameters_expand_to_their_leaves() {
        let model = customer_model();
        let query = QueryModel::new("by_address")
            .with_parameters(vec![model.column(&"address".into()).expect("address")]);

        assert_eq!(selected_paths(&query), vec!["address.city", "address.zip"]);
    }

    #[test]
    fn null_checks_cover_nullable_leaves_and_nullable_ancestors_once() {
        let model = customer_model();
        let query = QueryModel::new("by_city_and_mail").with_parameters(vec![
            model.column(&"address.city".into()).expect("city"),
            model.column(&"contact.email".into()).expect("email"),
            model.column(&"address.zip".into()).expect("zip"),
        ]);

        let function = compile(&model, &query).expect("compiles");
        let checked: Vec<&str> = function
            .null_checks()
            .iter()
            .map(|check| check.path().as_str())
            .collect();

        // address is a nullable container, contact is mandatory; zip is a
        // non-nullable scalar and address appears only once.
        assert_eq!(checked, vec!["address", "address.city", "contact.email"]);
    }

    #[test]
    fn unsupported_field_types_fail_before_any_artifact_is_built() {
        let model = person_model();
        let query = QueryModel::new("by_score")
            .with_parameters(vec![model.column(&"score".into()).expect("score")]);

        let err = compile(&model, &query).expect_err("score has no encoding");
        assert_eq!(
            err,
            CompileError::UnsupportedFieldType {
                path: "score".into(),
                ty: ColumnType::Unsupported,
            }
        );
    }

    #[test]
    fn unknown_predicate_fields_are_rejected_as_tokens() {
        let model = person_model();
        let query = QueryModel::new("bad_field").with_predicate(Predicate::compare(
            Operand::Field("nope".into()),
            CompareOp::Eq,
            Operand::Int(1),
        ));

        let err = compile(&model, &query).expect_err("unknown field");
        assert_eq!(
            err,
            CompileError::UnsupportedQueryToken {
                token: "nope".to_string(),
            }
        );
    }

    #[test]
    fn foreign_columns_cannot_be_bound() {
        use std::sync::Weak;

        let model = person_model();
        let ghost = ColumnModel::leaf("ghost".into(), ColumnType::Int32, Weak::new());
        let query = QueryModel::new("ghostly").with_parameters(vec![ghost]);

        let err = compile(&model, &query).expect_err("no reader exists for the column");
        assert!(
            matches!(err, CompileError::Instantiation { .. }),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn quote_stripping_removes_exactly_one_layer() {
        assert_eq!(dequote("'abc'"), "abc");
        assert_eq!(dequote("\"abc\""), "abc");
        assert_eq!(dequote("''x''"), "'x'");
        assert_eq!(dequote("plain"), "plain");
    }
}
