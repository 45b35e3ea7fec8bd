//! Built-in trigger templates.
//!
//! Each template is a ready-made [`NewTrigger`] under a stable slug; see
//! `TriggerRegistry::create_from_template` for how overrides are applied.

use serde::Serialize;
use serde_json::json;

use crate::model::{NewTrigger, TriggerType};

/// A named, ready-to-create trigger definition.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerTemplate {
    /// Stable slug used to select the template.
    pub slug: &'static str,
    #[serde(flatten)]
    pub trigger: NewTrigger,
}

/// The template catalog, in display order.
pub fn catalog() -> Vec<TriggerTemplate> {
    vec![
        template(
            "weekly_summary",
            NewTrigger::new("Resumo Semanal", TriggerType::Scheduled)
                .with_config(json!({ "schedule_type": "weekly", "day": "monday", "time": "09:00" }))
                .with_action(json!({ "type": "generate_summary", "period": "week" }))
                .with_description("Gera resumo das atividades da semana toda segunda às 9h"),
        ),
        template(
            "email_check",
            NewTrigger::new("Check de Emails", TriggerType::Scheduled)
                .with_config(json!({ "schedule_type": "interval", "interval": 2, "unit": "hours" }))
                .with_action(json!({ "type": "run_ai_analysis", "prompt": "Verificar emails importantes" }))
                .with_description("Verifica emails importantes a cada 2 horas"),
        ),
        template(
            "daily_backup",
            NewTrigger::new("Backup Diário", TriggerType::Scheduled)
                .with_config(json!({ "schedule_type": "daily", "time": "23:00" }))
                .with_action(json!({ "type": "backup_vault" }))
                .with_description("Executa backup do vault todo dia às 23h"),
        ),
        template(
            "project_template",
            NewTrigger::new("Template de Projeto", TriggerType::Event)
                .with_config(json!({
                    "event_type": "note_created",
                    "conditions": { "folder": "Projetos" }
                }))
                .with_action(json!({ "type": "apply_template", "template_name": "projeto" }))
                .with_description("Aplica template quando criar nota na pasta Projetos"),
        ),
        template(
            "urgent_alert",
            NewTrigger::new("Alerta Urgente", TriggerType::Event)
                .with_config(json!({
                    "event_type": "note_modified",
                    "conditions": { "tag": "#urgente" }
                }))
                .with_action(json!({
                    "type": "send_notification",
                    "title": "Nota Urgente",
                    "message": "A nota {note_path} foi marcada como urgente"
                }))
                .with_description("Envia alerta quando nota é marcada com #urgente"),
        ),
        template(
            "n8n_webhook",
            NewTrigger::new("Processar N8N", TriggerType::Webhook)
                .with_config(json!({ "source": "n8n" }))
                .with_action(json!({
                    "type": "create_note",
                    "path": "N8N/Automações",
                    "template": "# Dados do N8N\n\n**Recebido em:** {datetime}\n\n```json\n{data}\n```"
                }))
                .with_description("Processa dados recebidos do N8N e cria nota"),
        ),
        template(
            "whatsapp_note",
            NewTrigger::new("WhatsApp para Nota", TriggerType::Webhook)
                .with_config(json!({ "source": "whatsapp" }))
                .with_action(json!({
                    "type": "create_note",
                    "path": "WhatsApp/Mensagens",
                    "template": "# Mensagem WhatsApp\n\n**De:** {sender}\n**Data:** {datetime}\n\n{message}"
                }))
                .with_description("Cria nota quando recebe mensagem do WhatsApp"),
        ),
        template(
            "task_suggestion",
            NewTrigger::new("Sugestão de Tarefas", TriggerType::Intelligent)
                .with_config(json!({ "condition_type": "inactivity", "threshold_minutes": 60 }))
                .with_action(json!({
                    "type": "run_ai_analysis",
                    "prompt": "Baseado no contexto atual, sugira as próximas tarefas prioritárias"
                }))
                .with_description("Sugere tarefas após 1 hora de inatividade"),
        ),
        template(
            "daily_insights",
            NewTrigger::new("Insights Diários", TriggerType::Scheduled)
                .with_config(json!({ "schedule_type": "daily", "time": "20:00" }))
                .with_action(json!({
                    "type": "run_ai_analysis",
                    "prompt": "Analise as notas criadas hoje e gere insights relevantes"
                }))
                .with_description("Gera insights das notas do dia às 20h"),
        ),
    ]
}

/// Look a template up by slug or by its trigger name.
pub fn find(name: &str) -> Option<TriggerTemplate> {
    catalog()
        .into_iter()
        .find(|t| t.slug == name || t.trigger.name == name)
}

fn template(slug: &'static str, trigger: NewTrigger) -> TriggerTemplate {
    TriggerTemplate { slug, trigger }
}
