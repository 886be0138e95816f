use async_trait::async_trait;
use anyhow::{Result, anyhow};
use evalexpr::{eval_with_context, HashMapContext, ContextWithMutableVariables, DefaultNumericTypes};

use crate::curator::context::{Context, CurationObject};
use crate::curator::session::Session;
use crate::curator::status::{CURATE_FAIL, CURATE_SUCCESS};
use crate::task::ScriptedTask;
use crate::tasks::{Reporter, perform_by_id};

/// Scripted task whose body is an expression over the object.
///
/// Variables visible to the expression:
/// - `id`, `kind`, `name`, `member_count`
/// - every metadata field with `.` replaced by `_` (first value), e.g. `dc_title`
/// - `<field>_count` with the number of values, e.g. `dc_creator_count`
///
/// An integer result is returned as the status code; a boolean maps to
/// success/fail.
#[derive(Debug)]
pub struct ExpressionTask {
    script: String,
    reporter: Reporter,
}

impl ExpressionTask {
    pub fn new(script: &str) -> Self {
        Self {
            script: script.to_string(),
            reporter: Reporter::default(),
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    fn bind_object(&self, object: &CurationObject) -> Result<HashMapContext<DefaultNumericTypes>> {
        let mut eval_ctx = HashMapContext::<DefaultNumericTypes>::new();
        let kind = serde_json::to_value(object.kind)?
            .as_str()
            .unwrap_or_default()
            .to_string();

        let mut vars = vec![
            ("id".to_string(), evalexpr::Value::String(object.id.clone())),
            ("kind".to_string(), evalexpr::Value::String(kind)),
            ("name".to_string(), evalexpr::Value::String(object.name.clone())),
            ("member_count".to_string(), evalexpr::Value::Int(object.members.len() as i64)),
        ];
        for (field, values) in &object.metadata {
            let key = field.replace('.', "_");
            if let Some(first) = values.first() {
                vars.push((key.clone(), evalexpr::Value::String(first.clone())));
            }
            vars.push((format!("{}_count", key), evalexpr::Value::Int(values.len() as i64)));
        }

        for (k, v) in vars {
            eval_ctx
                .set_value(k.clone(), v)
                .map_err(|e| anyhow!("Failed to bind variable {}: {}", k, e))?;
        }
        Ok(eval_ctx)
    }

    fn evaluate(&self, object: &CurationObject) -> Result<i32> {
        let eval_ctx = self.bind_object(object)?;
        let value = eval_with_context(&self.script, &eval_ctx)
            .map_err(|e| anyhow!("Expression evaluation failed: {} -> {}", self.script, e))?;

        let status = match value {
            evalexpr::Value::Int(i) => i32::try_from(i)
                .map_err(|_| anyhow!("status code {} out of range", i))?,
            evalexpr::Value::Boolean(true) => CURATE_SUCCESS,
            evalexpr::Value::Boolean(false) => CURATE_FAIL,
            other => return Err(anyhow!("expression must yield an integer or boolean, got {:?}", other)),
        };
        self.reporter.report(format!("{} evaluated to {} for {}", self.script, status, object.id));
        Ok(status)
    }
}

#[async_trait]
impl ScriptedTask for ExpressionTask {
    async fn init(&self, session: &Session, task_name: &str) -> Result<()> {
        // Reject scripts that do not even parse before any object is touched.
        evalexpr::build_operator_tree::<DefaultNumericTypes>(&self.script)
            .map_err(|e| anyhow!("Invalid script for task {}: {}", task_name, e))?;
        self.reporter.bind(session, task_name);
        Ok(())
    }

    async fn perform_dso(&self, object: &CurationObject) -> Result<i32> {
        self.evaluate(object)
    }

    async fn perform_id(&self, ctx: &Context, id: &str) -> Result<i32> {
        perform_by_id(ctx, id, &self.reporter, |o| async move { self.evaluate(&o) }).await
    }
}
