// LLM prompt templates for the matching module.
// Shared fragments (JSON-only system prompt, truncation) live in llm_client::prompts.

/// Refinement scoring prompt. Replace `{resume_text}` and `{job_description}`.
pub const REFINEMENT_PROMPT_TEMPLATE: &str = r#"Analyze the match between this resume and job description. Provide scores (0-100) for:
1. Skills Match
2. Experience Match
3. Education Match
4. Overall Match

Resume:
{resume_text}

Job Description:
{job_description}

Return ONLY a JSON object with this format:
{
  "skills_score": <number>,
  "experience_score": <number>,
  "education_score": <number>,
  "overall_score": <number>
}"#;

/// Explanation prompt. Replace `{resume_text}`, `{job_description}` and `{overall_score}`.
pub const EXPLANATION_PROMPT_TEMPLATE: &str = r#"Based on this resume and job description, provide:
1. Top 3-5 strengths (why the candidate is a good fit)
2. Top 3-5 weaknesses (what is missing or does not match)
3. 2-3 recommendations for the recruiter

Resume:
{resume_text}

Job Description:
{job_description}

Match Score: {overall_score}%

Return ONLY a JSON object with this format:
{
  "strengths": ["strength1", "strength2"],
  "weaknesses": ["weakness1", "weakness2"],
  "recommendations": ["rec1", "rec2"],
  "summary": "Brief 1-2 sentence summary"
}"#;
