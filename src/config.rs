use super::errors::PoolError;


/// Ёмкость канала. Unbounded - push никогда не ждёт.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Unbounded,
    Bounded(usize),
}

impl Default for Capacity {
    fn default() -> Self {
        Capacity::Unbounded
    }
}


/// Конфигурация пула воркеров
#[derive(Debug, Clone)]
pub struct Config {
    pub task_capacity: Capacity,
    /// При `Bounded(n)` воркер ждёт в push, пока результаты не заберут.
    /// Такой пул нельзя останавливать до `collect`: воркеры не дойдут до
    /// своего Stop, и `shutdown` не вернётся.
    pub result_capacity: Capacity,
    /// Выполнять операции через spawn_blocking, чтобы не занимать поток рантайма
    pub offload_blocking: bool,
    pub default_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            task_capacity: Capacity::Unbounded,
            result_capacity: Capacity::Unbounded,
            offload_blocking: true,
            default_workers: num_cpus::get(),
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            task_capacity: Capacity::Bounded(num_cpus * 10),
            result_capacity: Capacity::Unbounded,
            offload_blocking: true,
            default_workers: num_cpus,
        }
    }

    /// Лёгкие операции: выполняем прямо в задаче воркера
    pub fn inline() -> Self {
        Self {
            offload_blocking: false,
            ..Default::default()
        }
    }

    pub fn task_capacity(mut self, capacity: Capacity) -> Self {
        self.task_capacity = capacity;
        self
    }

    /// См. поле `result_capacity`: с ограниченной ёмкостью результаты надо
    /// разбирать до `shutdown` или параллельно с ним
    pub fn result_capacity(mut self, capacity: Capacity) -> Self {
        self.result_capacity = capacity;
        self
    }

    pub fn offload_blocking(mut self, enabled: bool) -> Self {
        self.offload_blocking = enabled;
        self
    }

    pub fn default_workers(mut self, workers: usize) -> Self {
        self.default_workers = workers;
        self
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.task_capacity == Capacity::Bounded(0) {
            return Err(PoolError::config("task_capacity must be > 0"));
        }
        if self.result_capacity == Capacity::Bounded(0) {
            return Err(PoolError::config("result_capacity must be > 0"));
        }
        if self.default_workers == 0 {
            return Err(PoolError::config("default_workers must be > 0"));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.task_capacity, Capacity::Unbounded);
        assert!(config.offload_blocking);
        assert!(config.default_workers >= 1);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = Config::default().task_capacity(Capacity::Bounded(0));
        assert_eq!(
            config.validate(),
            Err(PoolError::Config("task_capacity must be > 0".into()))
        );

        let config = Config::inline().result_capacity(Capacity::Bounded(0));
        assert!(config.validate().is_err());

        let config = Config::cpu_bound().default_workers(0);
        assert!(config.validate().is_err());
    }
}
