//! The boolean query parser and planner: lexer, shunting-yard, AST,
//! algebraic rewrites, and cost-driven evaluation.

use crate::dictionary::BooleanPostings;
use crate::error::BooleanParseError;
use crate::normalize::normalize;
use crate::postings::{and_merge, and_not_merge, or_merge, BooleanPostingList, DocId};
use std::cell::OnceCell;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Keyword(String),
}

/// Replaces any character outside `[A-Za-z0-9_\s()]` with whitespace, pads
/// parentheses with whitespace, and splits on whitespace runs. Keyword tokens
/// are run through the same normalizer used at index time, so a query for
/// "dogs" matches a dictionary populated with the stemmed term "dog".
fn lex(query: &str) -> Vec<Token> {
    let mut cleaned = String::with_capacity(query.len());
    for c in query.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() || c == '(' || c == ')' {
            cleaned.push(c);
        } else {
            cleaned.push(' ');
        }
    }

    let mut padded = String::with_capacity(cleaned.len() * 2);
    for c in cleaned.chars() {
        if c == '(' || c == ')' {
            padded.push(' ');
            padded.push(c);
            padded.push(' ');
        } else {
            padded.push(c);
        }
    }

    padded
        .split_whitespace()
        .map(|tok| match tok {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "(" => Token::LParen,
            ")" => Token::RParen,
            other => Token::Keyword(normalize(other).next().unwrap_or_else(|| other.to_lowercase())),
        })
        .collect()
}

fn precedence(op: &Token) -> u8 {
    match op {
        Token::Or => 1,
        Token::And => 2,
        Token::Not => 3,
        _ => 0,
    }
}

/// Shunting-yard to RPN. `NOT` is unary and right-associative: an
/// incoming `NOT` never pops the operator stack (there is no higher-precedence
/// unary operator to make way for), which is what lets `NOT NOT x` parse as
/// `NOT(NOT(x))` instead of flushing the first `NOT` before its operand has
/// even been pushed. `AND`/`OR` pop while the stack top (of either kind) has
/// precedence >= their own, the usual left-associative binary rule.
fn to_rpn(tokens: Vec<Token>) -> Result<Vec<Token>, BooleanParseError> {
    let mut output = Vec::new();
    let mut op_stack: Vec<Token> = Vec::new();

    for tok in tokens {
        match tok {
            Token::Keyword(_) => output.push(tok),
            Token::Not => op_stack.push(tok),
            Token::And | Token::Or => {
                let prec = precedence(&tok);
                while let Some(top) = op_stack.last() {
                    if matches!(top, Token::LParen) || precedence(top) < prec {
                        break;
                    }
                    output.push(op_stack.pop().unwrap());
                }
                op_stack.push(tok);
            }
            Token::LParen => op_stack.push(tok),
            Token::RParen => loop {
                match op_stack.pop() {
                    Some(Token::LParen) => break,
                    Some(other) => output.push(other),
                    None => return Err(BooleanParseError::UnmatchedParen),
                }
            },
        }
    }

    while let Some(top) = op_stack.pop() {
        if matches!(top, Token::LParen) {
            return Err(BooleanParseError::UnmatchedParen);
        }
        output.push(top);
    }

    Ok(output)
}

/// A lazily-loaded keyword leaf: postings and skip pointers are fetched from
/// the reader on first access and cached for the rest of this query's
/// evaluation.
#[derive(Debug)]
struct KeywordNode {
    term: String,
    cache: OnceCell<BooleanPostingList>,
}

impl KeywordNode {
    fn new(term: String) -> Self {
        KeywordNode { term, cache: OnceCell::new() }
    }

    fn postings<'a>(&'a self, postings: &BooleanPostings) -> &'a BooleanPostingList {
        self.cache.get_or_init(|| postings.postings(&self.term))
    }

    /// Document frequency, straight out of the dictionary — no postings load
    /// required.
    fn document_frequency(&self, postings: &BooleanPostings) -> usize {
        postings.lookup(&self.term).map(|(df, _)| df as usize).unwrap_or(0)
    }
}

/// The boolean query AST.
#[derive(Debug)]
enum Node {
    Keyword(KeywordNode),
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    fn and(a: Node, b: Node) -> Node {
        let mut children = Vec::new();
        Self::flatten_into(a, &mut children, |n| matches!(n, Node::And(_)));
        Self::flatten_into(b, &mut children, |n| matches!(n, Node::And(_)));
        Node::And(children)
    }

    fn or(a: Node, b: Node) -> Node {
        let mut children = Vec::new();
        Self::flatten_into(a, &mut children, |n| matches!(n, Node::Or(_)));
        Self::flatten_into(b, &mut children, |n| matches!(n, Node::Or(_)));
        Node::Or(children)
    }

    fn flatten_into(n: Node, children: &mut Vec<Node>, is_same: impl Fn(&Node) -> bool) {
        if is_same(&n) {
            match n {
                Node::And(inner) | Node::Or(inner) => children.extend(inner),
                _ => unreachable!(),
            }
        } else {
            children.push(n);
        }
    }

    /// Upper-bound document count, cheap to compute without collapsing.
    fn count(&self, postings: &BooleanPostings) -> usize {
        match self {
            Node::Keyword(k) => k.document_frequency(postings),
            Node::Not(inner) => postings.all_docs().len() - inner.count(postings),
            Node::Or(children) => children.iter().map(|c| c.count(postings)).sum(),
            Node::And(children) => children.iter().map(|c| c.count(postings)).min().unwrap_or(0),
        }
    }

    fn collapse(&self, postings: &BooleanPostings) -> BooleanPostingList {
        match self {
            Node::Keyword(k) => k.postings(postings).clone(),
            Node::Not(inner) => {
                let inner_list = inner.collapse(postings);
                BooleanPostingList::unskipped(and_not_merge(postings.all_docs(), &inner_list.doc_ids))
            }
            Node::Or(children) => {
                let mut acc: Vec<DocId> = Vec::new();
                for (i, child) in children.iter().enumerate() {
                    let list = child.collapse(postings);
                    acc = if i == 0 { list.doc_ids } else { or_merge(&acc, &list.doc_ids) };
                }
                BooleanPostingList::unskipped(acc)
            }
            Node::And(children) => collapse_and(children, postings),
        }
    }
}

/// A child of an `And` ready for the cost-ordered fold, with its effective
/// count precomputed once: `child.count()` normally, but `child.inner.count()`
/// if the AND-NOT shortcut applies.
struct AndStep<'a> {
    node: &'a Node,
    effective_count: usize,
    and_not_shortcut: Option<&'a Node>,
}

fn plan_and_step<'a>(node: &'a Node, postings: &BooleanPostings, universe: usize) -> AndStep<'a> {
    if let Node::Not(inner) = node {
        let inner_count = inner.count(postings);
        let not_count = universe.saturating_sub(inner_count);
        if inner_count < not_count {
            return AndStep { node, effective_count: inner_count, and_not_shortcut: Some(inner) };
        }
    }
    AndStep { node, effective_count: node.count(postings), and_not_shortcut: None }
}

fn collapse_and(children: &[Node], postings: &BooleanPostings) -> BooleanPostingList {
    if children.is_empty() {
        return BooleanPostingList::unskipped(postings.all_docs().to_vec());
    }

    let universe = postings.all_docs().len();
    let mut steps: Vec<AndStep> = children.iter().map(|c| plan_and_step(c, postings, universe)).collect();
    steps.sort_by_key(|s| s.effective_count);

    let mut steps = steps.into_iter();
    let seed = steps.next().expect("checked non-empty above");
    let seed_list = seed.node.collapse(postings);
    let mut acc_docs = seed_list.doc_ids;
    let mut acc_skips = Some(seed_list.skips);

    for step in steps {
        if let Some(inner) = step.and_not_shortcut {
            let inner_list = inner.collapse(postings);
            acc_docs = and_not_merge(&acc_docs, &inner_list.doc_ids);
        } else {
            let child_list = step.node.collapse(postings);
            acc_docs = and_merge(&acc_docs, &child_list.doc_ids, acc_skips.as_ref(), Some(&child_list.skips));
        }
        acc_skips = None;
    }

    BooleanPostingList::unskipped(acc_docs)
}

fn build_ast(rpn: &[Token]) -> Result<Node, BooleanParseError> {
    let mut stack: Vec<Node> = Vec::new();
    for tok in rpn {
        match tok {
            Token::Keyword(term) => stack.push(Node::Keyword(KeywordNode::new(term.clone()))),
            Token::Not => {
                let child = stack
                    .pop()
                    .ok_or_else(|| BooleanParseError::MissingOperand { op: "NOT".to_string() })?;
                stack.push(Node::Not(Box::new(child)));
            }
            Token::And => {
                let b = stack
                    .pop()
                    .ok_or_else(|| BooleanParseError::MissingOperand { op: "AND".to_string() })?;
                let a = stack
                    .pop()
                    .ok_or_else(|| BooleanParseError::MissingOperand { op: "AND".to_string() })?;
                stack.push(Node::and(a, b));
            }
            Token::Or => {
                let b = stack
                    .pop()
                    .ok_or_else(|| BooleanParseError::MissingOperand { op: "OR".to_string() })?;
                let a = stack
                    .pop()
                    .ok_or_else(|| BooleanParseError::MissingOperand { op: "OR".to_string() })?;
                stack.push(Node::or(a, b));
            }
            Token::LParen | Token::RParen => unreachable!("RPN never contains parentheses"),
        }
    }

    if stack.len() > 1 {
        return Err(BooleanParseError::LeftoverOperands);
    }
    stack.pop().ok_or(BooleanParseError::EmptyQuery)
}

/// Applies the algebraic rewrites once, bottom-up: double negation
/// and De Morgan for an `Or` whose every child is a `Not`.
fn rewrite(node: Node) -> Node {
    match node {
        Node::Keyword(_) => node,
        Node::Not(child) => {
            let child = rewrite(*child);
            match child {
                Node::Not(inner) => *inner,
                other => Node::Not(Box::new(other)),
            }
        }
        Node::And(children) => Node::And(children.into_iter().map(rewrite).collect()),
        Node::Or(children) => {
            let children: Vec<Node> = children.into_iter().map(rewrite).collect();
            if !children.is_empty() && children.iter().all(|c| matches!(c, Node::Not(_))) {
                let complements: Vec<Node> = children
                    .into_iter()
                    .map(|c| match c {
                        Node::Not(inner) => *inner,
                        _ => unreachable!(),
                    })
                    .collect();
                Node::Not(Box::new(Node::And(complements)))
            } else {
                Node::Or(children)
            }
        }
    }
}

/// Parses and evaluates a boolean query against `postings`,
/// returning matching doc ids in ascending order.
pub fn evaluate(query: &str, postings: &BooleanPostings) -> Result<Vec<DocId>, BooleanParseError> {
    let tokens = lex(query);
    if tokens.is_empty() {
        return Err(BooleanParseError::EmptyQuery);
    }
    let rpn = to_rpn(tokens)?;
    let ast = build_ast(&rpn)?;
    let ast = rewrite(ast);
    Ok(ast.collapse(postings).doc_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(query: &str) -> Vec<Token> {
        lex(query)
    }

    #[test]
    fn lexer_uppercases_only_recognize_operators() {
        assert_eq!(
            tokens_of("Quick and Fox"),
            vec![
                Token::Keyword("quick".into()),
                Token::Keyword("and".into()),
                Token::Keyword("fox".into()),
            ]
        );
        assert_eq!(
            tokens_of("quick AND fox"),
            vec![Token::Keyword("quick".into()), Token::And, Token::Keyword("fox".into())]
        );
    }

    #[test]
    fn double_negation_is_not_chain_safe() {
        let tokens = lex("NOT NOT quick");
        let rpn = to_rpn(tokens).unwrap();
        let ast = build_ast(&rpn).unwrap();
        match &ast {
            Node::Not(inner) => assert!(matches!(**inner, Node::Not(_))),
            other => panic!("expected Not(Not(_)), got {other:?}"),
        }
        let rewritten = rewrite(ast);
        assert!(matches!(rewritten, Node::Keyword(_)));
    }

    #[test]
    fn and_not_parses_as_and_of_not() {
        let tokens = lex("a AND NOT b");
        let rpn = to_rpn(tokens).unwrap();
        let ast = build_ast(&rpn).unwrap();
        match ast {
            Node::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], Node::Keyword(_)));
                assert!(matches!(children[1], Node::Not(_)));
            }
            other => panic!("expected And([Keyword, Not]), got {other:?}"),
        }
    }

    #[test]
    fn demorgan_rewrites_or_of_nots() {
        let tokens = lex("NOT a OR NOT b");
        let rpn = to_rpn(tokens).unwrap();
        let ast = build_ast(&rpn).unwrap();
        let rewritten = rewrite(ast);
        match rewritten {
            Node::Not(inner) => assert!(matches!(*inner, Node::And(_))),
            other => panic!("expected Not(And(_)), got {other:?}"),
        }
    }

    #[test]
    fn unmatched_parenthesis_is_an_error() {
        let tokens = lex("(a AND b");
        assert_eq!(to_rpn(tokens), Err(BooleanParseError::UnmatchedParen));
    }

    #[test]
    fn missing_operand_is_an_error() {
        let rpn = vec![Token::Keyword("a".into()), Token::And];
        assert_eq!(
            build_ast(&rpn),
            Err(BooleanParseError::MissingOperand { op: "AND".to_string() })
        );
    }

    #[test]
    fn empty_query_is_an_error() {
        assert_eq!(to_rpn(lex("   ")), Ok(Vec::new()));
    }

    fn build_fixture() -> (tempfile::TempDir, BooleanPostings) {
        let corpus = tempfile::tempdir().unwrap();
        std::fs::write(corpus.path().join("1"), "quick brown fox").unwrap();
        std::fs::write(corpus.path().join("2"), "quick quick fox").unwrap();
        std::fs::write(corpus.path().join("3"), "lazy dog").unwrap();

        let workdir = tempfile::tempdir().unwrap();
        let dict_path = workdir.path().join("dictionary.txt");
        let post_path = workdir.path().join("postings.txt");
        crate::indexer::build_index(corpus.path(), &dict_path, &post_path, crate::dictionary::PostingFormat::Boolean)
            .unwrap();
        let postings = BooleanPostings::open(&dict_path, &post_path).unwrap();
        (workdir, postings)
    }

    #[test]
    fn quick_and_fox_matches_docs_one_and_two() {
        let (_workdir, postings) = build_fixture();
        assert_eq!(evaluate("quick AND fox", &postings).unwrap(), vec![1, 2]);
    }

    #[test]
    fn quick_and_not_brown_matches_doc_two_only() {
        let (_workdir, postings) = build_fixture();
        assert_eq!(evaluate("quick AND NOT brown", &postings).unwrap(), vec![2]);
    }

    #[test]
    fn quick_or_lazy_and_not_dog_matches_docs_one_and_two() {
        let (_workdir, postings) = build_fixture();
        assert_eq!(evaluate("(quick OR lazy) AND NOT dog", &postings).unwrap(), vec![1, 2]);
    }

    #[test]
    fn not_quick_matches_doc_three_only() {
        let (_workdir, postings) = build_fixture();
        assert_eq!(evaluate("NOT quick", &postings).unwrap(), vec![3]);
    }
}
