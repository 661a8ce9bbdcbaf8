//! Seeded default catalogs.
//!
//! These tables describe the stock hiring pipeline shipped with the product.
//! Companies copy them on instantiation and customize their own copies; the
//! tables themselves are never mutated.

use std::str::FromStr;

use super::{
    AutomationTemplate, CategoryCode, ChecklistTemplate, RejectionReasonTemplate, SlaTemplate,
    TemplateAction,
};
use crate::core::{
    AutomationTrigger, Condition, ConditionOperator, ContractType, Deadline, RejectionCategory,
    StageKind, StageTemplate,
};

const CLT_ONLY: [ContractType; 1] = [ContractType::Clt];
const EMPLOYMENT: [ContractType; 2] = [ContractType::Clt, ContractType::Estagio];

/// The full default stage set, in pipeline order.
///
/// Contract-type applicability trims the set on instantiation: PJ and
/// freelancer pipelines carry no medical exams and no probation stages;
/// internships carry no probation stages.
#[must_use]
pub fn stage_templates() -> Vec<StageTemplate> {
    vec![
        StageTemplate::new("Triagem de Currículos", StageKind::Initial)
            .with_description("Análise inicial dos currículos recebidos")
            .with_color("#3b82f6")
            .rejectable()
            .with_sla_days(2)
            .with_required_fields(["score"])
            .with_responsible_roles(["recrutador"])
            .with_auto_actions(["aprovacao_por_score"]),
        StageTemplate::new("Entrevista com RH", StageKind::Intermediate)
            .with_description("Entrevista comportamental conduzida pelo RH")
            .with_color("#8b5cf6")
            .rejectable()
            .with_sla_days(3)
            .with_required_fields(["resultado_entrevista"])
            .with_responsible_roles(["recrutador"]),
        StageTemplate::new("Entrevista com o Gestor", StageKind::Decision)
            .with_description("Entrevista técnica com o gestor da vaga")
            .with_color("#6366f1")
            .rejectable()
            .with_sla_days(3)
            .with_required_fields(["resultado_entrevista"])
            .with_responsible_roles(["gestor"]),
        StageTemplate::new("Testes Técnicos", StageKind::Intermediate)
            .with_description("Aplicação e correção de testes técnicos")
            .with_color("#06b6d4")
            .rejectable()
            .optional()
            .with_sla_days(5)
            .with_required_fields(["score"])
            .with_responsible_roles(["gestor"]),
        StageTemplate::new("Envio de Documentação", StageKind::Intermediate)
            .with_description("Coleta e conferência dos documentos admissionais")
            .with_color("#f59e0b")
            .with_sla_days(5)
            .with_required_fields(["checklist_completo"])
            .with_responsible_roles(["recrutador"])
            .with_auto_actions(["cobranca_documentos"]),
        StageTemplate::new("Realização de Exames Médicos", StageKind::Intermediate)
            .with_description("Agendamento e realização do exame admissional")
            .with_color("#10b981")
            .with_sla_days(7)
            .with_required_fields(["resultado_exame"])
            .with_responsible_roles(["recrutador"])
            .only_for(EMPLOYMENT),
        StageTemplate::new("Proposta e Aprovação Final", StageKind::Decision)
            .with_description("Envio da proposta e aprovação final")
            .with_color("#f97316")
            .rejectable()
            .with_sla_days(3)
            .with_responsible_roles(["gestor", "gestor_rh"]),
        StageTemplate::new("Admissão", StageKind::Final)
            .with_description("Assinatura do contrato e cadastro do colaborador")
            .with_color("#22c55e")
            .with_sla_days(5)
            .with_responsible_roles(["departamento_pessoal"]),
        StageTemplate::new("Integração", StageKind::PostContract)
            .with_description("Onboarding do novo colaborador")
            .with_color("#14b8a6")
            .with_sla_days(7)
            .with_responsible_roles(["recrutador", "gestor"]),
        StageTemplate::new("Período de Experiência – Fase 1", StageKind::PostContract)
            .with_description("Acompanhamento dos primeiros 45 dias")
            .with_color("#a855f7")
            .only_for(CLT_ONLY),
        StageTemplate::new("Prorrogação do Contrato de Experiência", StageKind::PostContract)
            .with_description("Prorrogação por mais 45 dias")
            .with_color("#a855f7")
            .only_for(CLT_ONLY),
        StageTemplate::new("Efetivação – Após 90 dias", StageKind::PostContract)
            .with_description("Decisão de efetivação ao fim da experiência")
            .with_color("#84cc16")
            .only_for(CLT_ONLY),
    ]
}

/// Checklist templates for a category, in catalog order.
#[must_use]
pub fn checklist_templates(code: CategoryCode) -> Vec<ChecklistTemplate> {
    match code {
        CategoryCode::Triagem => vec![
            ChecklistTemplate::new("Currículo analisado"),
            ChecklistTemplate::new("Pretensão salarial dentro da faixa"),
            ChecklistTemplate::new("Disponibilidade de início confirmada"),
        ],
        CategoryCode::Entrevista => vec![
            ChecklistTemplate::new("Entrevista agendada"),
            ChecklistTemplate::new("Feedback registrado"),
            ChecklistTemplate::new("Avaliação de fit cultural preenchida").optional(),
        ],
        CategoryCode::Documentacao => vec![
            ChecklistTemplate::new("RG e CPF recebidos"),
            ChecklistTemplate::new("Comprovante de residência recebido"),
            ChecklistTemplate::new("Carteira de trabalho digital conferida"),
            ChecklistTemplate::new("Dados bancários confirmados"),
            ChecklistTemplate::new("Certificados e diplomas conferidos").optional(),
        ],
        CategoryCode::Exames => vec![
            ChecklistTemplate::new("Exame admissional agendado"),
            ChecklistTemplate::new("ASO recebido"),
        ],
        CategoryCode::Integracao => vec![
            ChecklistTemplate::new("Equipamentos entregues"),
            ChecklistTemplate::new("Acessos criados"),
            ChecklistTemplate::new("Apresentação à equipe realizada"),
            ChecklistTemplate::new("Treinamento inicial concluído").optional(),
        ],
    }
}

/// Checklist templates looked up by a raw category string.
///
/// Unknown codes return an empty list; [`CatalogService`] instantiation
/// paths parse the code instead and surface `UnknownCategory`.
///
/// [`CatalogService`]: super::CatalogService
#[must_use]
pub fn checklist_templates_by_code(code: &str) -> Vec<ChecklistTemplate> {
    CategoryCode::from_str(code)
        .map(checklist_templates)
        .unwrap_or_default()
}

/// The default rejection reason catalog, in display order.
#[must_use]
pub fn rejection_reason_templates() -> Vec<RejectionReasonTemplate> {
    vec![
        RejectionReasonTemplate {
            name: "Perfil técnico insuficiente".to_string(),
            category: RejectionCategory::Tecnico,
            required: false,
        },
        RejectionReasonTemplate {
            name: "Reprovado no teste técnico".to_string(),
            category: RejectionCategory::Tecnico,
            required: false,
        },
        RejectionReasonTemplate {
            name: "Fit cultural inadequado".to_string(),
            category: RejectionCategory::Comportamental,
            required: true,
        },
        RejectionReasonTemplate {
            name: "Documentação incompleta".to_string(),
            category: RejectionCategory::Documentacao,
            required: false,
        },
        RejectionReasonTemplate {
            name: "Desistência do candidato".to_string(),
            category: RejectionCategory::Desistencia,
            required: false,
        },
        RejectionReasonTemplate {
            name: "Pretensão salarial acima da faixa".to_string(),
            category: RejectionCategory::Outros,
            required: false,
        },
        RejectionReasonTemplate {
            name: "Outro motivo".to_string(),
            category: RejectionCategory::Outros,
            required: true,
        },
    ]
}

/// SLA templates for a category.
#[must_use]
pub fn sla_templates(code: CategoryCode) -> Vec<SlaTemplate> {
    match code {
        CategoryCode::Triagem => vec![SlaTemplate {
            name: "Prazo de triagem".to_string(),
            deadline: Deadline::days(2),
            alert_before_hours: 4,
            alert_after_hours: 24,
            notification_targets: vec!["recrutador".to_string()],
            escalation_targets: vec!["gestor_rh".to_string()],
        }],
        CategoryCode::Entrevista => vec![SlaTemplate {
            name: "Prazo para feedback da entrevista".to_string(),
            deadline: Deadline::days(3),
            alert_before_hours: 8,
            alert_after_hours: 24,
            notification_targets: vec!["recrutador".to_string(), "gestor".to_string()],
            escalation_targets: vec!["gestor_rh".to_string()],
        }],
        CategoryCode::Documentacao => vec![SlaTemplate {
            name: "Prazo de entrega de documentos".to_string(),
            deadline: Deadline::days(5),
            alert_before_hours: 24,
            alert_after_hours: 48,
            notification_targets: vec!["recrutador".to_string()],
            escalation_targets: vec!["gestor_rh".to_string()],
        }],
        CategoryCode::Exames => vec![SlaTemplate {
            name: "Prazo do exame admissional".to_string(),
            deadline: Deadline::weeks(1),
            alert_before_hours: 24,
            alert_after_hours: 48,
            notification_targets: vec!["recrutador".to_string()],
            escalation_targets: vec!["gestor_rh".to_string()],
        }],
        CategoryCode::Integracao => vec![SlaTemplate {
            name: "Prazo de onboarding".to_string(),
            deadline: Deadline::weeks(1),
            alert_before_hours: 24,
            alert_after_hours: 72,
            notification_targets: vec!["recrutador".to_string(), "gestor".to_string()],
            escalation_targets: vec!["gestor_rh".to_string()],
        }],
    }
}

/// Automation templates for a category.
#[must_use]
pub fn automation_templates(code: CategoryCode) -> Vec<AutomationTemplate> {
    match code {
        CategoryCode::Triagem => vec![AutomationTemplate {
            name: "Aprovação automática por score".to_string(),
            trigger: AutomationTrigger::FieldUpdate,
            conditions: vec![Condition::number("score", ConditionOperator::Gte, 80.0)],
            action: TemplateAction::AdvanceStage,
            delay_minutes: 0,
            max_attempts: 3,
        }],
        CategoryCode::Entrevista => vec![AutomationTemplate {
            name: "Avanço após aprovação na entrevista".to_string(),
            trigger: AutomationTrigger::FieldUpdate,
            conditions: vec![Condition::text(
                "resultado_entrevista",
                ConditionOperator::Eq,
                "aprovado",
            )],
            action: TemplateAction::AdvanceStage,
            delay_minutes: 0,
            max_attempts: 3,
        }],
        CategoryCode::Documentacao => vec![
            AutomationTemplate {
                name: "Avanço com documentação completa".to_string(),
                trigger: AutomationTrigger::FieldUpdate,
                conditions: vec![Condition::boolean("checklist_completo", true)],
                action: TemplateAction::AdvanceStage,
                delay_minutes: 0,
                max_attempts: 3,
            },
            AutomationTemplate {
                name: "Cobrança de documentos pendentes".to_string(),
                trigger: AutomationTrigger::StageEntry,
                conditions: vec![Condition::number(
                    "dias_na_etapa",
                    ConditionOperator::Gte,
                    3.0,
                )],
                action: TemplateAction::Notify {
                    target: "recrutador".to_string(),
                    message: "Candidato com documentos pendentes há 3 dias".to_string(),
                },
                delay_minutes: 4320,
                max_attempts: 3,
            },
        ],
        CategoryCode::Exames => vec![AutomationTemplate {
            name: "Notificação de agendamento de exames".to_string(),
            trigger: AutomationTrigger::StageEntry,
            conditions: Vec::new(),
            action: TemplateAction::Notify {
                target: "recrutador".to_string(),
                message: "Agendar exame admissional do candidato".to_string(),
            },
            delay_minutes: 0,
            max_attempts: 3,
        }],
        CategoryCode::Integracao => vec![AutomationTemplate {
            name: "Checklist de integração completo".to_string(),
            trigger: AutomationTrigger::FieldUpdate,
            conditions: vec![Condition::boolean("checklist_completo", true)],
            action: TemplateAction::AdvanceStage,
            delay_minutes: 0,
            max_attempts: 3,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_templates_cover_all_kinds() {
        let templates = stage_templates();
        assert!(templates.iter().any(|t| t.kind == StageKind::Initial));
        assert!(templates.iter().any(|t| t.kind == StageKind::Final));
        assert!(templates.iter().any(|t| t.kind == StageKind::PostContract));
    }

    #[test]
    fn test_pj_excludes_clt_only_stages() {
        let excluded = [
            "Realização de Exames Médicos",
            "Período de Experiência – Fase 1",
            "Prorrogação do Contrato de Experiência",
            "Efetivação – Após 90 dias",
        ];
        for template in stage_templates() {
            if excluded.contains(&template.name.as_str()) {
                assert!(
                    !template.applies_to(ContractType::Pj),
                    "'{}' must not apply to PJ",
                    template.name
                );
            }
        }
    }

    #[test]
    fn test_estagio_keeps_exams_but_not_probation() {
        let templates = stage_templates();
        let exams = templates
            .iter()
            .find(|t| t.name == "Realização de Exames Médicos")
            .unwrap();
        assert!(exams.applies_to(ContractType::Estagio));

        let probation = templates
            .iter()
            .find(|t| t.name == "Período de Experiência – Fase 1")
            .unwrap();
        assert!(!probation.applies_to(ContractType::Estagio));
    }

    #[test]
    fn test_every_category_has_checklists_and_slas() {
        for code in CategoryCode::ALL {
            assert!(!checklist_templates(code).is_empty(), "{code}");
            assert!(!sla_templates(code).is_empty(), "{code}");
        }
    }

    #[test]
    fn test_unknown_code_lookup_is_empty() {
        assert!(checklist_templates_by_code("onboarding").is_empty());
        assert!(!checklist_templates_by_code("triagem").is_empty());
    }

    #[test]
    fn test_automation_templates_validate() {
        for code in CategoryCode::ALL {
            for template in automation_templates(code) {
                for condition in &template.conditions {
                    condition.validate().unwrap();
                }
            }
        }
    }
}
