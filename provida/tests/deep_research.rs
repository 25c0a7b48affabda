//! Deep-research workflow end to end: plan, collect, analyze, update_kg,
//! synthesize and fact_check over canned search results.

mod common;

use std::sync::Arc;

use provida::workflows::research::EvidenceLevel;
use provida::knowledge::NO_CONTEXT_ANSWER;
use provida::{
    DeepResearchWorkflow, KnowledgeBootstrap, MockLlm, RagQuery, SearchRouter, SeedArticle,
    StaticSearch, VectorStore,
};

use common::{hit, settings, Fixture};

const TOPIC: &str = "vitamin D dosage";

const PLAN_JSON: &str = r#"{
  "research_topic": "vitamin D dosage",
  "research_questions": [
    {"question": "What daily dose do adults need?", "search_query": "vitamin D daily dose adults"},
    {"question": "When does supplementation become toxic?", "search_query": "vitamin D toxicity threshold"},
    {"question": "Does dosing differ in obesity?", "search_query": "vitamin D obesity dosing"}
  ]
}"#;

const SUMMARY: &str = "Adults need 600 to 800 IU of vitamin D daily [https://nih.example/dose]. \
    Intakes above 4000 IU per day raise the risk of hypercalcemia [https://nih.example/toxicity]. \
    Obese adults may need two to three times more [https://rumor.example].";

const CLAIMS_JSON: &str = r#"[
  {"subject": "adults", "predicate": "NEED", "object": "600 to 800 IU of vitamin D"},
  {"subject": "vitamin D above 4000 IU", "predicate": "RAISES_RISK_OF", "object": "hypercalcemia"}
]"#;

fn source_of(prompt: &str) -> &'static str {
    ["https://nih.example/dose", "https://ods.example/rda", "https://nih.example/toxicity"]
        .into_iter()
        .find(|id| prompt.contains(&format!("Source: {}\n", id)))
        .unwrap_or("unknown")
}

/// Answers each research prompt by its content, so concurrent fan-out calls
/// get stable answers.
fn research_answer(prompt: &str) -> String {
    if prompt.contains("Extract every factual claim") {
        CLAIMS_JSON.to_string()
    } else if prompt.contains("Answer the research topic") {
        serde_json::json!({
            "summary": SUMMARY,
            "citations_used": ["https://nih.example/dose", "https://rumor.example"]
        })
        .to_string()
    } else if prompt.contains("Analyse the source below") {
        let id = source_of(prompt);
        serde_json::json!({
            "summary": format!("Findings reported by {}", id),
            "evidence_level": "B",
            "justification": "randomised controlled trial",
            "keywords": ["vitamin D", "dosage"]
        })
        .to_string()
    } else if prompt.contains("Answer the question concisely") {
        "Chronic intake above 4000 IU causes hypercalcemia.".to_string()
    } else if prompt.contains("You plan clinical literature research") {
        PLAN_JSON.to_string()
    } else {
        "unexpected prompt".to_string()
    }
}

fn research_llm() -> MockLlm {
    MockLlm::from_fn(research_answer)
}

fn router() -> SearchRouter {
    SearchRouter::new(Arc::new(
        StaticSearch::new("pubmed_search", "peer-reviewed papers")
            .with_results(
                "vitamin D daily dose adults",
                vec![
                    hit(
                        "https://nih.example/dose",
                        "Recommended dietary allowance for adults aged 19 to 70 is 600 IU per day.",
                    ),
                    hit(
                        "https://ods.example/rda",
                        "Serum 25-hydroxyvitamin D above 50 nmol/L is adequate for bone health in most people.",
                    ),
                ],
            )
            .with_results(
                "vitamin D toxicity threshold",
                vec![hit(
                    "https://nih.example/toxicity",
                    "Tolerable upper intake level is 4000 IU; hypercalcemia follows chronic excess.",
                )],
            )
            .with_results(
                "vitamin D obesity dosing",
                vec![hit("https://never.example", "must not be searched")],
            ),
    ))
}

/// **Scenario**: "vitamin D dosage" with search_limit 2: two questions searched, three
/// sources analysed in order, a cited summary, every claim unverified against an empty graph.
#[tokio::test]
async fn vitamin_d_dosage_end_to_end() {
    let fx = Fixture::new(research_llm());
    let wf = DeepResearchWorkflow::new(fx.collaborators(), router(), settings(3)).unwrap();

    let out = wf.run(TOPIC, Some(2)).await.unwrap();

    let plan = out.plan.as_ref().unwrap();
    assert_eq!(plan.research_questions.len(), 3);

    let collected: Vec<&str> = out.collected.iter().map(|c| c.source_identifier.as_str()).collect();
    assert_eq!(
        collected,
        vec![
            "https://nih.example/dose",
            "https://ods.example/rda",
            "https://nih.example/toxicity"
        ]
    );
    assert!(out.collected.iter().all(|c| c.tool == "pubmed_search"));

    assert_eq!(out.analyzed.len(), 3);
    for (item, analyzed) in out.collected.iter().zip(&out.analyzed) {
        assert_eq!(item.source_identifier, analyzed.source_identifier);
        assert!(!analyzed.failed);
        assert_eq!(analyzed.analysis.evidence_level, EvidenceLevel::B);
        assert_eq!(
            analyzed.analysis.summary,
            format!("Findings reported by {}", item.source_identifier)
        );
    }

    let report = out.final_report.as_ref().unwrap();
    assert_eq!(report.summary.as_deref(), Some(SUMMARY));
    assert!(report.failure_reason.is_none());
    assert_eq!(
        report.citations_used,
        vec!["https://nih.example/dose", "https://nih.example/toxicity"]
    );

    let verification = out.verification_report.as_ref().unwrap();
    assert!(verification.hallucination_detected);
    assert_eq!(verification.verified_count, 0);
    assert_eq!(verification.unverified_count, 2);

    assert_eq!(fx.graph.node_count("Topic"), 1);
    assert_eq!(fx.graph.node_count("Summary"), 3);
    assert_eq!(
        fx.graph
            .node("Source", "https://nih.example/toxicity")
            .and_then(|s| s.get("status").cloned()),
        Some(serde_json::json!("ingested"))
    );
    assert!(!fx.vectors.is_empty().await.unwrap());
}

/// **Scenario**: Running the same topic twice ingests nothing new the second time, and
/// neither finished run is left in the default checkpointer.
#[tokio::test]
async fn rerun_is_idempotent_on_the_graph() {
    let fx = Fixture::new(research_llm());
    let wf = DeepResearchWorkflow::new(fx.collaborators(), router(), settings(3)).unwrap();

    wf.run(TOPIC, Some(2)).await.unwrap();
    let nodes = fx.graph.node_count("Source");
    let rels = fx.graph.relationship_count();
    let chunks = fx.vectors.len().await.unwrap();

    wf.run(TOPIC, Some(2)).await.unwrap();
    assert_eq!(fx.graph.node_count("Source"), nodes);
    assert_eq!(fx.graph.relationship_count(), rels);
    assert_eq!(fx.vectors.len().await.unwrap(), chunks);
    assert_eq!(wf.retained_runs().await, Some(0));
}

/// **Scenario**: A failing search tool yields no sources and the synthesis refuses.
#[tokio::test]
async fn failing_search_leads_to_refusal() {
    let fx = Fixture::new(research_llm());
    let router = SearchRouter::new(Arc::new(StaticSearch::new("web", "general").failing("503")));
    let wf = DeepResearchWorkflow::new(fx.collaborators(), router, settings(3)).unwrap();

    let out = wf.run(TOPIC, None).await.unwrap();

    assert!(out.collected.is_empty());
    assert!(out.analyzed.is_empty());
    let report = out.final_report.unwrap();
    assert_eq!(report.summary, None);
    assert_eq!(report.failure_reason.as_deref(), Some("no analyzed sources"));
    let verification = out.verification_report.unwrap();
    assert_eq!(verification.verified_count + verification.unverified_count, 0);
    assert!(!verification.hallucination_detected);
    assert!(verification.message.is_some());
}

/// **Scenario**: An undecodable plan becomes an empty plan and nothing is searched.
#[tokio::test]
async fn undecodable_plan_is_empty_plan() {
    let fx = Fixture::new(MockLlm::with_content("I would rather not"));
    let wf = DeepResearchWorkflow::new(fx.collaborators(), router(), settings(3)).unwrap();

    let out = wf.run(TOPIC, Some(5)).await.unwrap();

    let plan = out.plan.unwrap();
    assert_eq!(plan.research_topic, TOPIC);
    assert!(plan.research_questions.is_empty());
    assert!(out.collected.is_empty());
    assert!(out.final_report.unwrap().failure_reason.is_some());
}

/// **Scenario**: A source whose analysis cannot be decoded is flagged and kept out of the graph.
#[tokio::test]
async fn failed_analysis_is_flagged_sentinel() {
    let fx = Fixture::new(MockLlm::from_fn(|prompt| {
        if prompt.contains("Source: https://ods.example/rda\n") {
            "not json at all".to_string()
        } else if prompt.contains("Output:\nnot json at all") {
            "still not json".to_string()
        } else {
            research_answer(prompt)
        }
    }));
    let wf = DeepResearchWorkflow::new(fx.collaborators(), router(), settings(3)).unwrap();

    let out = wf.run(TOPIC, Some(2)).await.unwrap();

    assert_eq!(out.analyzed.len(), 3);
    let failed = &out.analyzed[1];
    assert!(failed.failed);
    assert_eq!(failed.analysis.evidence_level, EvidenceLevel::E);
    assert!(!out.analyzed[0].failed && !out.analyzed[2].failed);
    assert_eq!(fx.graph.node_count("Summary"), 2);
    assert!(fx.graph.node("Source", "https://ods.example/rda").is_none());
}

/// **Scenario**: Seed articles are graded and ingested through update_kg, a broken one is
/// left out, a second bootstrap adds nothing, and a RAG query answers from the seeded chunks.
#[tokio::test]
async fn bootstrap_then_rag_answers_from_seeded_chunks() {
    let fx = Fixture::new(MockLlm::from_fn(|prompt| {
        if prompt.contains("Source: seed:broken\n") {
            "not json at all".to_string()
        } else if prompt.contains("Output:\nnot json at all") {
            "still not json".to_string()
        } else {
            research_answer(prompt)
        }
    }));
    let bootstrap = KnowledgeBootstrap::new(&fx.collaborators(), &settings(3)).unwrap();
    let seeds = vec![
        SeedArticle::new(
            "https://nih.example/toxicity",
            "Tolerable upper intake level is 4000 IU; hypercalcemia follows chronic excess.",
        )
        .with_topic(TOPIC),
        SeedArticle::new("seed:broken", "Unstructured notes on vitamin D in obesity.").with_topic(TOPIC),
        SeedArticle::new("seed:blank", "   "),
    ];

    let report = bootstrap.run(seeds.clone()).await.unwrap();
    assert_eq!((report.processed, report.failed, report.skipped_empty), (1, 1, 1));
    assert_eq!(fx.graph.node_count("Topic"), 1);
    assert_eq!(fx.graph.node_count("Summary"), 1);
    assert!(fx.graph.node("Source", "seed:broken").is_none());
    let chunks = fx.vectors.len().await.unwrap();
    assert!(chunks > 0);

    bootstrap.run(seeds).await.unwrap();
    assert_eq!(fx.vectors.len().await.unwrap(), chunks);
    assert_eq!(fx.graph.node_count("Source"), 1);

    let rag = RagQuery::new(fx.vectors.clone(), fx.llm.clone());
    let answer = rag.answer("vitamin D toxicity hypercalcemia").await.unwrap();
    assert!(answer.grounded);
    assert_eq!(answer.summary, "Chronic intake above 4000 IU causes hypercalcemia.");
    assert_eq!(answer.sources, vec!["https://nih.example/toxicity"]);
}

/// **Scenario**: A RAG query before anything was ingested refuses without calling the model.
#[tokio::test]
async fn rag_on_empty_knowledge_base_refuses() {
    let fx = Fixture::new(research_llm());
    let answer = RagQuery::new(fx.vectors.clone(), fx.llm.clone())
        .answer("vitamin D dosage")
        .await
        .unwrap();
    assert!(!answer.grounded);
    assert_eq!(answer.summary, NO_CONTEXT_ANSWER);
    assert_eq!(fx.llm.call_count(), 0);
}
