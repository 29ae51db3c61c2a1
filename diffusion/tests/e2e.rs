use diffusion::{Corpus, DiffusionConfig, DiffusionTrainer, GradientPolicy, Strategy};
use diffusion_core::{MASK, Tokenizer};
use model::PositionalModel;
use rand::{SeedableRng, rngs::StdRng};

const SENTENCE: &str = "the cat sat down";

fn config(strategy: Strategy) -> DiffusionConfig {
    DiffusionConfig {
        num_timesteps: 5,
        max_length: 4,
        learning_rate: 1.0,
        epochs: 60,
        top_k: 1,
        strategy,
        batch_size: 2,
        log_interval: 20,
        seed: Some(11),
        ..Default::default()
    }
}

fn trainer(config: DiffusionConfig) -> DiffusionTrainer<PositionalModel, StdRng> {
    let tokenizer = Tokenizer::from_corpus([SENTENCE]);
    let mut rng = StdRng::seed_from_u64(2);
    let model =
        PositionalModel::new(config.max_length, tokenizer.vocab_size(), 0.1, &mut rng).unwrap();

    DiffusionTrainer::from_config(model, tokenizer, config)
}

fn mean_loss(stats: &[diffusion_core::EpochStats]) -> f32 {
    stats.iter().map(|s| s.loss()).sum::<f32>() / stats.len() as f32
}

#[test]
fn every_strategy_learns_a_single_sentence() {
    for strategy in [Strategy::Basic, Strategy::Masked, Strategy::FractionExact] {
        let mut trainer = trainer(config(strategy));
        let stats = trainer.train_sentences(&[SENTENCE; 6]).unwrap();

        assert_eq!(stats.len(), 60);
        let (first, last) = (mean_loss(&stats[..5]), mean_loss(&stats[55..]));
        assert!(last < first, "{strategy:?}: {first} -> {last}");

        assert_eq!(trainer.generate_text().unwrap(), SENTENCE, "{strategy:?}");
    }
}

#[test]
fn batch_gradient_policy_also_learns() {
    let mut config = config(Strategy::Masked);
    config.gradient_policy = GradientPolicy::Batch;

    let mut trainer = trainer(config);
    let stats = trainer.train_sentences(&[SENTENCE; 5]).unwrap();

    assert!(mean_loss(&stats[55..]) < mean_loss(&stats[..5]));
    assert_eq!(trainer.generate_text().unwrap(), SENTENCE);
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = |cpu_fraction: f32| {
        let mut config = config(Strategy::Masked);
        config.cpu_fraction = cpu_fraction;
        config.epochs = 10;

        let mut trainer = trainer(config);
        let stats = trainer.train_sentences(&[SENTENCE; 7]).unwrap();
        let losses: Vec<f32> = stats.iter().map(|s| s.loss()).collect();
        (losses, trainer.into_model().table().to_owned())
    };

    assert_eq!(run(0.01), run(1.0));
}

#[test]
fn generations_never_contain_mask() {
    let config = DiffusionConfig {
        top_k: 3,
        epochs: 3,
        ..config(Strategy::Masked)
    };
    let mut trainer = trainer(config);
    trainer.train_sentences(&[SENTENCE, "the dog sat"]).unwrap();

    for strategy in [Strategy::Basic, Strategy::Masked, Strategy::FractionExact] {
        let sampler = diffusion::Sampler::new(trainer.model(), trainer.config());
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..20 {
            let seq = sampler.generate(strategy, &mut rng).unwrap();
            assert_eq!(seq.len(), 4);
            assert!(!seq.contains(&MASK));
        }
    }
}

#[test]
fn a_model_of_the_wrong_length_fails_training() {
    let config = config(Strategy::Masked);
    let tokenizer = Tokenizer::from_corpus([SENTENCE]);
    let mut rng = StdRng::seed_from_u64(2);
    let model = PositionalModel::new(3, tokenizer.vocab_size(), 0.1, &mut rng).unwrap();
    let mut trainer = DiffusionTrainer::from_config(model, tokenizer, config);

    let corpus = Corpus::encode(trainer.tokenizer(), [SENTENCE], 4);
    assert!(trainer.train(&corpus).is_err());
}
